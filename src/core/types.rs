use std::collections::HashMap;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::config::{
    DEFAULT_EQUATION_RELAXATION, DEFAULT_EQUATION_STIFFNESS, DEFAULT_FRICTION,
    DEFAULT_RESTITUTION,
};

/// Rigid placement of a shape or body: position and orientation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

impl Transform {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Applies `local` on top of this transform.
    pub fn combine(&self, local: &Transform) -> Transform {
        Transform {
            position: self.position + self.rotation * local.position,
            rotation: self.rotation * local.rotation,
        }
    }

    pub fn point_to_world(&self, local: Vec3) -> Vec3 {
        self.position + self.rotation * local
    }

    pub fn point_to_local(&self, world: Vec3) -> Vec3 {
        self.rotation.conjugate() * (world - self.position)
    }

    pub fn vector_to_world(&self, local: Vec3) -> Vec3 {
        self.rotation * local
    }

    pub fn vector_to_local(&self, world: Vec3) -> Vec3 {
        self.rotation.conjugate() * world
    }
}

/// Handle to a [`Material`] registered with a world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MaterialId(pub(crate) u32);

impl MaterialId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Surface coefficients attached to bodies or shapes.
///
/// An unset coefficient defers to the contact material of the pair.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    pub name: String,
    pub friction: Option<f32>,
    pub restitution: Option<f32>,
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = Some(friction);
        self
    }

    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = Some(restitution);
        self
    }
}

/// Interaction parameters for a pair of materials.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactMaterialParams {
    pub friction: f32,
    pub restitution: f32,
    pub contact_stiffness: f32,
    pub contact_relaxation: f32,
    pub friction_stiffness: f32,
    pub friction_relaxation: f32,
}

impl Default for ContactMaterialParams {
    fn default() -> Self {
        Self {
            friction: DEFAULT_FRICTION,
            restitution: DEFAULT_RESTITUTION,
            contact_stiffness: DEFAULT_EQUATION_STIFFNESS,
            contact_relaxation: DEFAULT_EQUATION_RELAXATION,
            friction_stiffness: DEFAULT_EQUATION_STIFFNESS,
            friction_relaxation: DEFAULT_EQUATION_RELAXATION,
        }
    }
}

impl ContactMaterialParams {
    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    pub fn with_contact_spook(mut self, stiffness: f32, relaxation: f32) -> Self {
        self.contact_stiffness = stiffness;
        self.contact_relaxation = relaxation;
        self
    }

    pub fn with_friction_spook(mut self, stiffness: f32, relaxation: f32) -> Self {
        self.friction_stiffness = stiffness;
        self.friction_relaxation = relaxation;
        self
    }
}

/// Contact parameters used whenever materials `a` and `b` touch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ContactMaterial {
    pub a: MaterialId,
    pub b: MaterialId,
    pub params: ContactMaterialParams,
}

impl ContactMaterial {
    pub fn new(a: MaterialId, b: MaterialId, params: ContactMaterialParams) -> Self {
        Self { a, b, params }
    }

    /// Order-independent lookup key.
    pub fn key(&self) -> (MaterialId, MaterialId) {
        pair_key(self.a, self.b)
    }
}

pub(crate) fn pair_key(a: MaterialId, b: MaterialId) -> (MaterialId, MaterialId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Resolves one coefficient for a contact: when both surfaces define it the
/// product wins, otherwise the contact material value applies.
pub(crate) fn mix_coefficient(a: Option<f32>, b: Option<f32>, fallback: f32) -> f32 {
    match (a, b) {
        (Some(a), Some(b)) if a >= 0.0 && b >= 0.0 => a * b,
        _ => fallback,
    }
}

/// Registered materials and contact materials of a world.
#[derive(Debug, Clone, Default)]
pub struct MaterialTable {
    materials: Vec<Material>,
    contact_materials: HashMap<(MaterialId, MaterialId), ContactMaterialParams>,
    pub default: ContactMaterialParams,
}

impl MaterialTable {
    pub fn new(default: ContactMaterialParams) -> Self {
        Self {
            default,
            ..Self::default()
        }
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.push(material);
        MaterialId((self.materials.len() - 1) as u32)
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.index())
    }

    /// Registers (or replaces) the parameters for a material pair.
    pub fn add_contact_material(&mut self, contact: ContactMaterial) {
        self.contact_materials.insert(contact.key(), contact.params);
    }

    pub fn contact_material(&self, a: MaterialId, b: MaterialId) -> Option<&ContactMaterialParams> {
        self.contact_materials.get(&pair_key(a, b))
    }

    fn lookup(&self, a: Option<MaterialId>, b: Option<MaterialId>) -> Option<ContactMaterialParams> {
        match (a, b) {
            (Some(a), Some(b)) => self.contact_material(a, b).copied(),
            _ => None,
        }
    }

    /// Parameters for a touching shape pair: the shape materials' contact
    /// material, else the body materials', else the default. Friction and
    /// restitution become products when both surfaces define them.
    pub fn resolve(
        &self,
        body_a: Option<MaterialId>,
        body_b: Option<MaterialId>,
        shape_a: Option<MaterialId>,
        shape_b: Option<MaterialId>,
    ) -> ContactMaterialParams {
        let mut params = self
            .lookup(shape_a, shape_b)
            .or_else(|| self.lookup(body_a, body_b))
            .unwrap_or(self.default);

        let side_a = shape_a.or(body_a).and_then(|id| self.material(id));
        let side_b = shape_b.or(body_b).and_then(|id| self.material(id));
        if let (Some(ma), Some(mb)) = (side_a, side_b) {
            params.friction = mix_coefficient(ma.friction, mb.friction, params.friction);
            params.restitution = mix_coefficient(ma.restitution, mb.restitution, params.restitution);
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coefficients_multiply_only_when_both_sides_define_them() {
        assert!((mix_coefficient(Some(0.5), Some(0.4), 0.3) - 0.2).abs() < 1e-6);
        assert!((mix_coefficient(Some(0.5), None, 0.3) - 0.3).abs() < 1e-6);
        assert!((mix_coefficient(None, None, 0.7) - 0.7).abs() < 1e-6);
    }

    #[test]
    fn contact_material_key_is_symmetric() {
        let a = MaterialId(3);
        let b = MaterialId(1);
        let cm = ContactMaterial::new(a, b, ContactMaterialParams::default());
        assert_eq!(cm.key(), pair_key(b, a));
    }

    #[test]
    fn transform_round_trips_points() {
        let t = Transform::new(Vec3::new(1.0, 2.0, 3.0), Quat::from_rotation_y(1.1));
        let p = Vec3::new(-0.5, 0.25, 4.0);
        let back = t.point_to_local(t.point_to_world(p));
        assert!((back - p).length() < 1e-5);
    }

    #[test]
    fn shape_contact_material_wins_over_body_one() {
        let mut table = MaterialTable::new(ContactMaterialParams::default());
        let ice = table.add_material(Material::new("ice"));
        let rubber = table.add_material(Material::new("rubber"));
        let steel = table.add_material(Material::new("steel"));
        table.add_contact_material(ContactMaterial::new(
            ice,
            steel,
            ContactMaterialParams::default().with_friction(0.01),
        ));
        table.add_contact_material(ContactMaterial::new(
            rubber,
            steel,
            ContactMaterialParams::default().with_friction(0.9),
        ));

        let body_only = table.resolve(Some(steel), Some(ice), None, None);
        assert!((body_only.friction - 0.01).abs() < 1e-6);

        let with_shape = table.resolve(Some(steel), Some(ice), None, Some(rubber));
        assert!((with_shape.friction - 0.9).abs() < 1e-6);

        let unknown = table.resolve(Some(ice), Some(rubber), None, None);
        assert_eq!(unknown, ContactMaterialParams::default());
    }

    #[test]
    fn material_coefficients_multiply() {
        let mut table = MaterialTable::new(ContactMaterialParams::default());
        let a = table.add_material(Material::new("a").with_friction(0.5).with_restitution(0.8));
        let b = table.add_material(Material::new("b").with_friction(0.4));
        let params = table.resolve(Some(a), Some(b), None, None);
        assert!((params.friction - 0.2).abs() < 1e-6);
        assert!((params.restitution - ContactMaterialParams::default().restitution).abs() < 1e-6);
    }
}
