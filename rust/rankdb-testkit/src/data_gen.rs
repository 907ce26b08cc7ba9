use rankdb_query::Record;
use rankdb_scoring::{DocId, DocItr};

/// Builds a record from `(field, value)` pairs.
pub fn record(fields: &[(&str, f32)]) -> Record {
    fields.iter().map(|&(k, v)| (k.to_string(), v)).collect()
}

/// Drains an iterator from the start, returning every `(id, score)`.
pub fn drain(itr: &mut dyn DocItr) -> Vec<(DocId, f32)> {
    let mut out = Vec::new();
    let mut min_id = 0;
    while itr.next(min_id).unwrap() {
        out.push(itr.cur());
        min_id = itr.cur().0 + 1;
    }
    out
}

/// Records over `fields` holding small integers, each field present with
/// probability 0.8. Sums and products of such values are exact in f32, so any
/// evaluation order produces identical scores.
pub fn integer_records(rng: &mut fastrand::Rng, fields: &[&str], count: usize) -> Vec<Record> {
    let mut records = Vec::with_capacity(count);
    for _ in 0..count {
        let mut record = Record::new();
        for &name in fields {
            if rng.u8(0..10) < 8 {
                record.insert(name.to_string(), rng.i8(-5..=10) as f32);
            }
        }
        records.push(record);
    }
    records
}

/// Shape of a generated real-valued field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    /// Smallest value of the uniform base, before scaling.
    pub offset: f32,
    /// Range of decimal exponents the base is scaled by.
    pub min_exp: i32,
    pub max_exp: i32,
}

impl FieldSpec {
    /// A field of non-negative values spanning `10^min_exp..10^(max_exp + 1)`.
    pub fn non_negative(name: &'static str, min_exp: i32, max_exp: i32) -> FieldSpec {
        FieldSpec {
            name,
            offset: 0.0,
            min_exp,
            max_exp,
        }
    }

    /// A field of mixed-sign values spanning the same magnitudes.
    pub fn signed(name: &'static str, min_exp: i32, max_exp: i32) -> FieldSpec {
        FieldSpec {
            name,
            offset: -0.3,
            min_exp,
            max_exp,
        }
    }

    fn sample(&self, rng: &mut fastrand::Rng) -> f32 {
        (rng.f32() + self.offset) * 10f32.powi(rng.i32(self.min_exp..=self.max_exp))
    }
}

/// Real-valued records whose fields span several orders of magnitude, so
/// inverting a scorer in f32 rounds. About one value in twenty repeats an
/// earlier one to produce exact ties.
pub fn real_records(rng: &mut fastrand::Rng, fields: &[FieldSpec], count: usize) -> Vec<Record> {
    let mut seen = Vec::new();
    let mut records = Vec::with_capacity(count);
    for _ in 0..count {
        let mut record = Record::new();
        for spec in fields {
            if rng.u8(0..10) == 0 {
                continue;
            }
            let value = if !seen.is_empty() && rng.u8(0..20) == 0 {
                seen[rng.usize(0..seen.len())]
            } else {
                spec.sample(rng)
            };
            seen.push(value);
            record.insert(spec.name.to_string(), value);
        }
        records.push(record);
    }
    records
}
