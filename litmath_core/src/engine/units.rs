use std::collections::BTreeMap;
use std::fmt;

use num_rational::BigRational;
use num_traits::One;

use super::numeric::Numeric;
use super::numeric::parse_decimal;
use crate::EvalError;
use crate::EvalResult;

/// Exponents of base dimensions, e.g. `{length: 1, time: -1}` for speed.
/// Currencies use their base code as the dimension name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Dimension(BTreeMap<String, i32>);

impl Dimension {
	pub fn base(name: impl Into<String>) -> Self {
		Self(BTreeMap::from([(name.into(), 1)]))
	}

	fn from_pairs(pairs: &[(&str, i32)]) -> Self {
		Self(
			pairs
				.iter()
				.map(|(name, exponent)| ((*name).to_string(), *exponent))
				.collect(),
		)
	}

	pub fn is_dimensionless(&self) -> bool {
		self.0.is_empty()
	}

	pub fn mul(&self, other: &Self) -> Self {
		let mut result = self.0.clone();
		for (name, exponent) in &other.0 {
			let entry = result.entry(name.clone()).or_insert(0);
			*entry += exponent;
			if *entry == 0 {
				result.remove(name);
			}
		}

		Self(result)
	}

	pub fn powi(&self, exponent: i32) -> Self {
		if exponent == 0 {
			return Self::default();
		}

		Self(
			self.0
				.iter()
				.map(|(name, value)| (name.clone(), value * exponent))
				.collect(),
		)
	}
}

/// A named unit registered with the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitDef {
	pub name: String,
	/// Size of one of this unit measured in the base units of its dimension.
	pub factor: BigRational,
	pub dimension: Dimension,
}

/// How a new unit is defined when calling [`UnitRegistry::create_unit`].
#[derive(Debug, Clone, PartialEq)]
pub enum UnitDefinition {
	/// A new base unit with its own dimension.
	Base,
	/// `factor` of an existing unit.
	Alias { factor: BigRational, of: String },
}

impl UnitDefinition {
	/// A unit such that one `of` is worth `rate` of it, as with exchange
	/// rates. `None` unless `rate` is finite and positive.
	pub fn per(rate: f64, of: impl Into<String>) -> Option<Self> {
		if !rate.is_finite() || rate <= 0.0 {
			return None;
		}

		let rate = parse_decimal(&format!("{rate:e}"))?;
		Some(Self::Alias {
			factor: rate.recip(),
			of: of.into(),
		})
	}
}

/// `(name, factor, dimension)` for every unit known without configuration.
const BUILTIN_UNITS: &[(&str, &str, &[(&str, i32)])] = &[
	// length
	("m", "1", &[("length", 1)]),
	("meter", "1", &[("length", 1)]),
	("meters", "1", &[("length", 1)]),
	("km", "1000", &[("length", 1)]),
	("kilometer", "1000", &[("length", 1)]),
	("kilometers", "1000", &[("length", 1)]),
	("cm", "0.01", &[("length", 1)]),
	("mm", "0.001", &[("length", 1)]),
	("um", "0.000001", &[("length", 1)]),
	("nm", "0.000000001", &[("length", 1)]),
	("inch", "0.0254", &[("length", 1)]),
	("inches", "0.0254", &[("length", 1)]),
	("ft", "0.3048", &[("length", 1)]),
	("foot", "0.3048", &[("length", 1)]),
	("feet", "0.3048", &[("length", 1)]),
	("yd", "0.9144", &[("length", 1)]),
	("yard", "0.9144", &[("length", 1)]),
	("yards", "0.9144", &[("length", 1)]),
	("mi", "1609.344", &[("length", 1)]),
	("mile", "1609.344", &[("length", 1)]),
	("miles", "1609.344", &[("length", 1)]),
	// mass
	("kg", "1", &[("mass", 1)]),
	("kilogram", "1", &[("mass", 1)]),
	("kilograms", "1", &[("mass", 1)]),
	("g", "0.001", &[("mass", 1)]),
	("gram", "0.001", &[("mass", 1)]),
	("grams", "0.001", &[("mass", 1)]),
	("mg", "0.000001", &[("mass", 1)]),
	("t", "1000", &[("mass", 1)]),
	("tonne", "1000", &[("mass", 1)]),
	("lb", "0.45359237", &[("mass", 1)]),
	("lbs", "0.45359237", &[("mass", 1)]),
	("oz", "0.028349523125", &[("mass", 1)]),
	// time
	("s", "1", &[("time", 1)]),
	("second", "1", &[("time", 1)]),
	("seconds", "1", &[("time", 1)]),
	("ms", "0.001", &[("time", 1)]),
	("min", "60", &[("time", 1)]),
	("minute", "60", &[("time", 1)]),
	("minutes", "60", &[("time", 1)]),
	("h", "3600", &[("time", 1)]),
	("hour", "3600", &[("time", 1)]),
	("hours", "3600", &[("time", 1)]),
	("day", "86400", &[("time", 1)]),
	("days", "86400", &[("time", 1)]),
	("week", "604800", &[("time", 1)]),
	("weeks", "604800", &[("time", 1)]),
	// volume
	("L", "0.001", &[("length", 3)]),
	("l", "0.001", &[("length", 3)]),
	("liter", "0.001", &[("length", 3)]),
	("liters", "0.001", &[("length", 3)]),
	("mL", "0.000001", &[("length", 3)]),
	("ml", "0.000001", &[("length", 3)]),
	// derived
	("Hz", "1", &[("time", -1)]),
	("N", "1", &[("mass", 1), ("length", 1), ("time", -2)]),
	("J", "1", &[("mass", 1), ("length", 2), ("time", -2)]),
	("kJ", "1000", &[("mass", 1), ("length", 2), ("time", -2)]),
	("Wh", "3600", &[("mass", 1), ("length", 2), ("time", -2)]),
	("kWh", "3600000", &[("mass", 1), ("length", 2), ("time", -2)]),
	("W", "1", &[("mass", 1), ("length", 2), ("time", -3)]),
	("kW", "1000", &[("mass", 1), ("length", 2), ("time", -3)]),
	("Pa", "1", &[("mass", 1), ("length", -1), ("time", -2)]),
];

/// Every unit the engine can resolve by name.
#[derive(Debug, Clone, Default)]
pub struct UnitRegistry {
	units: BTreeMap<String, UnitDef>,
}

impl UnitRegistry {
	pub fn with_builtins() -> Self {
		let units = BUILTIN_UNITS
			.iter()
			.filter_map(|(name, factor, dimension)| {
				let factor = parse_decimal(factor)?;
				let def = UnitDef {
					name: (*name).to_string(),
					factor,
					dimension: Dimension::from_pairs(dimension),
				};
				Some(((*name).to_string(), def))
			})
			.collect();

		Self { units }
	}

	pub fn get(&self, name: &str) -> Option<&UnitDef> {
		self.units.get(name)
	}

	pub fn contains(&self, name: &str) -> bool {
		self.units.contains_key(name)
	}

	pub fn len(&self) -> usize {
		self.units.len()
	}

	pub fn is_empty(&self) -> bool {
		self.units.is_empty()
	}

	/// The named unit as a single term compound unit.
	pub fn unit(&self, name: &str) -> Option<CompoundUnit> {
		self.get(name).map(CompoundUnit::from_def)
	}

	/// Register a unit. An existing unit with the same name is only replaced
	/// when `override_existing` is set.
	pub fn create_unit(
		&mut self,
		name: &str,
		definition: UnitDefinition,
		override_existing: bool,
	) -> EvalResult<&UnitDef> {
		let creation_error = |reason: &str| {
			EvalError::UnitCreation {
				name: name.to_string(),
				reason: reason.to_string(),
			}
		};

		if !is_valid_unit_name(name) {
			return Err(creation_error("unit names must be alphanumeric"));
		}

		if self.units.contains_key(name) && !override_existing {
			return Err(creation_error("a unit with this name already exists"));
		}

		let def = match definition {
			UnitDefinition::Base => {
				UnitDef {
					name: name.to_string(),
					factor: BigRational::one(),
					dimension: Dimension::base(name),
				}
			}
			UnitDefinition::Alias { factor, of } => {
				let Some(target) = self.units.get(&of) else {
					return Err(creation_error(&format!("unit \"{of}\" not found")));
				};

				UnitDef {
					name: name.to_string(),
					factor: factor * &target.factor,
					dimension: target.dimension.clone(),
				}
			}
		};

		self.units.insert(name.to_string(), def);
		self.units
			.get(name)
			.ok_or_else(|| creation_error("unit was not stored"))
	}
}

fn is_valid_unit_name(name: &str) -> bool {
	let mut chars = name.chars();
	chars
		.next()
		.is_some_and(|first| first.is_alphabetic() || first == '_')
		&& chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// A product of named units raised to integer powers, e.g. `km / h`.
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundUnit {
	terms: Vec<(String, i32)>,
	factor: BigRational,
	dimension: Dimension,
}

impl CompoundUnit {
	pub fn from_def(def: &UnitDef) -> Self {
		Self {
			terms: vec![(def.name.clone(), 1)],
			factor: def.factor.clone(),
			dimension: def.dimension.clone(),
		}
	}

	pub fn factor(&self) -> &BigRational {
		&self.factor
	}

	pub fn dimension(&self) -> &Dimension {
		&self.dimension
	}

	pub fn is_dimensionless(&self) -> bool {
		self.dimension.is_dimensionless()
	}

	pub fn is_compatible(&self, other: &Self) -> bool {
		self.dimension == other.dimension
	}

	pub fn mul(&self, other: &Self) -> Self {
		let mut terms = self.terms.clone();
		for (name, exponent) in &other.terms {
			match terms.iter_mut().find(|(existing, _)| existing == name) {
				Some((_, current)) => *current += exponent,
				None => terms.push((name.clone(), *exponent)),
			}
		}
		terms.retain(|(_, exponent)| *exponent != 0);

		Self {
			terms,
			factor: &self.factor * &other.factor,
			dimension: self.dimension.mul(&other.dimension),
		}
	}

	pub fn div(&self, other: &Self) -> Self {
		self.mul(&other.powi(-1))
	}

	pub fn powi(&self, exponent: i32) -> Self {
		let power = exponent.unsigned_abs() as usize;
		let numerator = num_traits::pow(self.factor.numer().clone(), power);
		let denominator = num_traits::pow(self.factor.denom().clone(), power);
		let factor = BigRational::new(numerator, denominator);

		Self {
			terms: self
				.terms
				.iter()
				.filter(|_| exponent != 0)
				.map(|(name, value)| (name.clone(), value * exponent))
				.collect(),
			factor: if exponent < 0 { factor.recip() } else { factor },
			dimension: self.dimension.powi(exponent),
		}
	}
}

impl fmt::Display for CompoundUnit {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let write_term = |name: &str, exponent: i32| {
			if exponent == 1 {
				name.to_string()
			} else {
				format!("{name}^{exponent}")
			}
		};

		let numerator: Vec<_> = self
			.terms
			.iter()
			.filter(|(_, exponent)| *exponent > 0)
			.map(|(name, exponent)| write_term(name, *exponent))
			.collect();
		let denominator: Vec<_> = self
			.terms
			.iter()
			.filter(|(_, exponent)| *exponent < 0)
			.map(|(name, exponent)| write_term(name, -exponent))
			.collect();

		if numerator.is_empty() {
			let inverse: Vec<_> = self
				.terms
				.iter()
				.map(|(name, exponent)| format!("{name}^{exponent}"))
				.collect();
			return f.write_str(&inverse.join(" "));
		}

		f.write_str(&numerator.join(" "))?;
		if !denominator.is_empty() {
			write!(f, " / {}", denominator.join(" "))?;
		}

		Ok(())
	}
}

/// A number measured in a unit, e.g. `5 km`.
#[derive(Debug, Clone, PartialEq)]
pub struct Quantity {
	pub value: Numeric,
	pub unit: CompoundUnit,
}

impl Quantity {
	pub fn new(value: Numeric, unit: CompoundUnit) -> Self {
		Self { value, unit }
	}

	/// The value expressed in the base units of its dimension.
	pub fn base_value(&self) -> Numeric {
		self.value.scale(&self.unit.factor)
	}

	pub fn convert(&self, target: &CompoundUnit) -> EvalResult<Self> {
		if !self.unit.is_compatible(target) {
			return Err(EvalError::UnitMismatch {
				left: self.unit.to_string(),
				right: target.to_string(),
			});
		}

		let ratio = &self.unit.factor / &target.factor;
		Ok(Self {
			value: self.value.scale(&ratio),
			unit: target.clone(),
		})
	}
}

