//! Incident ions, target materials and layers.

use crate::units::C_U;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Incident {
    z: usize,
    /// kg
    mass: f64,
}

impl Incident {
    pub fn new(z: usize, mass: f64) -> Self {
        Self { z, mass }
    }

    /// mass: u
    pub fn with_mass_u(z: usize, mass: f64) -> Self {
        Self::new(z, mass * C_U)
    }

    pub fn z(&self) -> usize {
        self.z
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Element {
    pub z: usize,
    /// Average (natural) mass, kg
    pub avg_mass: f64,
}

impl Element {
    pub fn new(z: usize, avg_mass: f64) -> Self {
        Self { z, avg_mass }
    }
}

/// Target composition as atomic fractions.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    name: String,
    elements: Vec<Element>,
    concs: Vec<f64>,
}

impl Material {
    /// Fractions are normalized to sum to one.
    pub fn new(name: &str, composition: Vec<(Element, f64)>) -> Self {
        let (elements, concs): (Vec<Element>, Vec<f64>) = composition.into_iter().unzip();
        let mut material = Self {
            name: name.to_string(),
            elements,
            concs,
        };
        material.normalize();
        material
    }

    pub fn elemental(name: &str, element: Element) -> Self {
        Self::new(name, vec![(element, 1.0)])
    }

    pub fn normalize(&mut self) {
        let sum: f64 = self.concs.iter().sum();
        if sum > 0.0 {
            for c in &mut self.concs {
                *c /= sum;
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Elements and their atomic fractions.
    pub fn iter(&self) -> impl Iterator<Item = (&Element, f64)> + '_ {
        self.elements.iter().zip(self.concs.iter().copied())
    }

    /// Distinct Z2 values, in order of first appearance.
    pub fn distinct_z(&self) -> Vec<usize> {
        let mut zs: Vec<usize> = Vec::with_capacity(self.elements.len());
        for e in &self.elements {
            if !zs.contains(&e.z) {
                zs.push(e.z);
            }
        }
        zs
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    material: Material,
    /// 1/m^2
    thickness: f64,
    roughness: f64,
}

impl Layer {
    pub fn new(material: Material, thickness: f64) -> Self {
        Self {
            material,
            thickness,
            roughness: 0.0,
        }
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    /// thickness: 1/m^2
    pub fn thickness(&self) -> f64 {
        self.thickness
    }

    pub fn roughness(&self) -> f64 {
        self.roughness
    }

    pub fn set_thickness(mut self, thickness: f64) -> Self {
        self.thickness = thickness;
        self
    }

    pub fn set_roughness(mut self, roughness: f64) -> Self {
        self.roughness = roughness;
        self
    }
}
