/// Tracks which keys overlapped this step and last step.
///
/// Both lists are kept sorted; `tick` swaps them at the start of a step and
/// `diff` walks them in lock-step to find keys that appeared or vanished.
#[derive(Debug, Clone)]
pub struct OverlapKeeper<K> {
    current: Vec<K>,
    previous: Vec<K>,
}

impl<K> Default for OverlapKeeper<K> {
    fn default() -> Self {
        Self {
            current: Vec::new(),
            previous: Vec::new(),
        }
    }
}

impl<K: Ord + Copy> OverlapKeeper<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an overlap for the current step; repeated keys are ignored.
    pub fn set(&mut self, key: K) {
        if let Err(pos) = self.current.binary_search(&key) {
            self.current.insert(pos, key);
        }
    }

    /// Makes the current list the previous one and starts an empty step.
    pub fn tick(&mut self) {
        std::mem::swap(&mut self.current, &mut self.previous);
        self.current.clear();
    }

    pub fn contains(&self, key: &K) -> bool {
        self.current.binary_search(key).is_ok()
    }

    pub fn was_overlapping(&self, key: &K) -> bool {
        self.previous.binary_search(key).is_ok()
    }

    pub fn current(&self) -> &[K] {
        &self.current
    }

    /// Drops every entry matching `pred` from both lists.
    pub fn forget(&mut self, mut pred: impl FnMut(&K) -> bool) {
        self.current.retain(|k| !pred(k));
        self.previous.retain(|k| !pred(k));
    }

    /// Keys new this step go to `additions`, keys gone since last step to `removals`.
    pub fn diff(&self, additions: &mut Vec<K>, removals: &mut Vec<K>) {
        let (mut i, mut j) = (0, 0);
        while i < self.current.len() && j < self.previous.len() {
            let c = self.current[i];
            let p = self.previous[j];
            match c.cmp(&p) {
                std::cmp::Ordering::Less => {
                    additions.push(c);
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    removals.push(p);
                    j += 1;
                }
                std::cmp::Ordering::Equal => {
                    i += 1;
                    j += 1;
                }
            }
        }
        additions.extend_from_slice(&self.current[i..]);
        removals.extend_from_slice(&self.previous[j..]);
    }
}
