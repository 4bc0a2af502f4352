use crate::core::rigidbody::{Body, BodyType, SleepState};

/// State change reported by [`sleep_tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepTransition {
    Wakeup,
    Sleepy,
    Sleep,
}

/// Advances the sleep state machine of one dynamic body at world time `time`.
///
/// AWAKE bodies slower than the limit become SLEEPY; SLEEPY bodies that stay
/// slow past the time limit fall asleep, and ones that speed up again wake.
pub fn sleep_tick(body: &mut Body, time: f32) -> Option<SleepTransition> {
    if !body.allow_sleep || body.body_type != BodyType::Dynamic {
        return None;
    }
    let speed_squared = body.speed_squared();
    let limit_squared = body.sleep_speed_limit * body.sleep_speed_limit;

    match body.sleep_state {
        SleepState::Awake if speed_squared < limit_squared => {
            body.sleep_state = SleepState::Sleepy;
            body.time_last_sleepy = time;
            Some(SleepTransition::Sleepy)
        }
        SleepState::Sleepy if speed_squared > limit_squared => {
            body.wake_up();
            Some(SleepTransition::Wakeup)
        }
        SleepState::Sleepy if time - body.time_last_sleepy > body.sleep_time_limit => {
            body.sleep();
            Some(SleepTransition::Sleep)
        }
        _ => None,
    }
}

/// True when a sleeping `body` touched by `other` should wake after the
/// narrowphase: the partner must be awake, non-static and moving at least
/// `sqrt(2)` times the body's speed limit.
pub fn should_wake_from_contact(body: &Body, other: &Body) -> bool {
    body.allow_sleep
        && body.body_type == BodyType::Dynamic
        && body.sleep_state == SleepState::Sleeping
        && other.sleep_state == SleepState::Awake
        && other.body_type != BodyType::Static
        && other.speed_squared() >= 2.0 * other.sleep_speed_limit * other.sleep_speed_limit
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn resting() -> Body {
        Body::new(1.0).with_sleep_limits(0.1, 1.0)
    }

    #[test]
    fn slow_body_goes_sleepy_then_sleeps() {
        let mut body = resting();
        assert_eq!(sleep_tick(&mut body, 0.0), Some(SleepTransition::Sleepy));
        assert_eq!(sleep_tick(&mut body, 0.5), None);
        body.velocity = Vec3::new(0.01, 0.0, 0.0);
        assert_eq!(sleep_tick(&mut body, 1.01), Some(SleepTransition::Sleep));
        assert_eq!(body.sleep_state(), SleepState::Sleeping);
        assert_eq!(body.velocity, Vec3::ZERO);
    }

    #[test]
    fn sleepy_body_wakes_when_it_speeds_up() {
        let mut body = resting();
        sleep_tick(&mut body, 0.0);
        body.velocity = Vec3::new(1.0, 0.0, 0.0);
        assert_eq!(sleep_tick(&mut body, 0.1), Some(SleepTransition::Wakeup));
        assert_eq!(body.sleep_state(), SleepState::Awake);
    }

    #[test]
    fn only_dynamic_bodies_sleep() {
        let mut ground = Body::new(0.0);
        assert_eq!(sleep_tick(&mut ground, 0.0), None);
        let mut restless = resting().with_allow_sleep(false);
        assert_eq!(sleep_tick(&mut restless, 0.0), None);
    }

    #[test]
    fn fast_partner_wakes_sleeper() {
        let mut sleeper = resting();
        sleeper.sleep();
        let slow = resting().with_velocity(Vec3::new(0.12, 0.0, 0.0));
        let fast = resting().with_velocity(Vec3::new(0.2, 0.0, 0.0));
        assert!(!should_wake_from_contact(&sleeper, &slow));
        assert!(should_wake_from_contact(&sleeper, &fast));
        assert!(!should_wake_from_contact(&sleeper, &Body::new(0.0)));
    }
}
