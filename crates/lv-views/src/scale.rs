//! Scales and axes derived from a dataset
//!
//! A scale maps attribute values into a pixel interval. Numeric attributes use
//! a linear scale over the observed range; anything else is laid out as evenly
//! spaced points, one per distinct label.

use indexmap::IndexSet;
use lv_core::{category_label, Dataset, Record, Value};

/// How an attribute is projected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    Numeric,
    Categorical,
}

/// Attribute name plus the kind inferred from the data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDescriptor {
    pub name: String,
    pub kind: AttributeKind,
}

impl AttributeDescriptor {
    /// Classify `attribute` over every record of `dataset`.
    ///
    /// A single value that does not coerce to a number makes the whole
    /// attribute categorical.
    pub fn infer(dataset: &Dataset, attribute: &str) -> Self {
        let numeric = dataset
            .iter()
            .all(|record| record.number(attribute).is_some());

        Self {
            name: attribute.to_string(),
            kind: if numeric {
                AttributeKind::Numeric
            } else {
                AttributeKind::Categorical
            },
        }
    }
}

/// Axis direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    /// Larger values sit higher, so pixel 0 is the top of the extent
    Vertical,
}

/// Linear mapping from a closed numeric domain to a pixel range
#[derive(Debug, Clone, PartialEq)]
pub struct LinearScale {
    domain: (f64, f64),
    range: (f32, f32),
}

impl LinearScale {
    /// Build a scale; a degenerate domain is padded around its value
    pub fn new(domain: (f64, f64), range: (f32, f32)) -> Self {
        let (min, max) = domain;
        let domain = if min == max {
            let pad = if min == 0.0 { 1.0 } else { min.abs() * 0.1 };
            (min - pad, max + pad)
        } else {
            (min, max)
        };

        Self { domain, range }
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    pub fn range(&self) -> (f32, f32) {
        self.range
    }

    /// Value to pixel; values outside the domain extrapolate
    pub fn map(&self, value: f64) -> f32 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        let t = (value - d0) / (d1 - d0);
        r0 + (r1 - r0) * t as f32
    }

    /// Pixel to value
    pub fn invert(&self, pixel: f32) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if r0 == r1 {
            return d0;
        }
        let t = ((pixel - r0) / (r1 - r0)) as f64;
        d0 + (d1 - d0) * t
    }

    /// About `count` round values inside the domain
    pub fn ticks(&self, count: usize) -> Vec<f64> {
        let (start, stop) = self.domain;
        let step = tick_step(start, stop, count);
        if !step.is_finite() || step <= 0.0 {
            return Vec::new();
        }

        // Small steps are applied as divisions so 0.1 * 3 prints as 0.3
        if step >= 1.0 {
            let first = (start / step).ceil() as i64;
            let last = (stop / step).floor() as i64;
            (first..=last).map(|i| i as f64 * step).collect()
        } else {
            let inverse = (1.0 / step).round();
            let first = (start * inverse).ceil() as i64;
            let last = (stop * inverse).floor() as i64;
            (first..=last).map(|i| i as f64 / inverse).collect()
        }
    }

    /// Distance between consecutive ticks for `count`
    pub fn tick_step(&self, count: usize) -> f64 {
        tick_step(self.domain.0, self.domain.1, count)
    }
}

// Step of 1, 2 or 5 times a power of ten
fn tick_step(start: f64, stop: f64, count: usize) -> f64 {
    let raw = (stop - start).abs() / count.max(1) as f64;
    let mut step = 10f64.powf(raw.log10().floor());
    let error = raw / step;

    if error >= 50f64.sqrt() {
        step *= 10.0;
    } else if error >= 10f64.sqrt() {
        step *= 5.0;
    } else if error >= 2f64.sqrt() {
        step *= 2.0;
    }
    step
}

/// Evenly spaced positions for an ordered set of labels
#[derive(Debug, Clone, PartialEq)]
pub struct PointScale {
    domain: IndexSet<String>,
    range: (f32, f32),
}

impl PointScale {
    pub fn new(domain: IndexSet<String>, range: (f32, f32)) -> Self {
        Self { domain, range }
    }

    pub fn domain(&self) -> &IndexSet<String> {
        &self.domain
    }

    pub fn range(&self) -> (f32, f32) {
        self.range
    }

    pub fn len(&self) -> usize {
        self.domain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domain.is_empty()
    }

    /// Pixel of a label, or `None` if it is not in the domain
    pub fn map(&self, label: &str) -> Option<f32> {
        self.domain.get_index_of(label).map(|index| self.position(index))
    }

    /// Pixel of the label at `index`.
    ///
    /// Labels are spread from the low end of the range to the high end; a
    /// reversed range is filled from its far end, so the first label of a
    /// vertical axis sits at the bottom. A single label sits in the middle.
    pub fn position(&self, index: usize) -> f32 {
        let n = self.domain.len();
        let (r0, r1) = self.range;
        let (start, stop) = (r0.min(r1), r0.max(r1));
        let step = (stop - start) / (n.saturating_sub(1)).max(1) as f32;
        let start = start + (stop - start - step * n.saturating_sub(1) as f32) * 0.5;

        let slot = if r1 < r0 { n - 1 - index } else { index };
        start + step * slot as f32
    }

    /// Labels whose pixel lies within `[low, high]`, in domain order
    pub fn values_within(&self, low: f32, high: f32) -> Vec<String> {
        let (low, high) = (low.min(high), low.max(high));
        self.domain
            .iter()
            .enumerate()
            .filter(|(index, _)| {
                let pixel = self.position(*index);
                pixel >= low && pixel <= high
            })
            .map(|(_, label)| label.clone())
            .collect()
    }
}

/// Either kind of scale
#[derive(Debug, Clone, PartialEq)]
pub enum Scale {
    Linear(LinearScale),
    Point(PointScale),
}

impl Scale {
    /// Pixel of a raw value; `None` when the value has no place on the scale
    pub fn project(&self, value: Option<&Value>) -> Option<f32> {
        match self {
            Scale::Linear(scale) => value.and_then(Value::as_number).map(|v| scale.map(v)),
            Scale::Point(scale) => scale.map(&category_label(value)),
        }
    }
}

/// One tick mark: where it goes and what it reads
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub offset: f32,
    pub label: String,
}

/// A scale placed on the surface
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    pub descriptor: AttributeDescriptor,
    pub scale: Scale,
    /// Cross-axis pixel of the axis line: `y` for horizontal, `x` for vertical
    pub position: f32,
    pub orientation: Orientation,
}

impl Axis {
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn kind(&self) -> AttributeKind {
        self.descriptor.kind
    }

    /// Pixel of `record`'s value along the axis
    pub fn project(&self, record: &Record) -> Option<f32> {
        self.scale.project(record.get(&self.descriptor.name))
    }

    /// Pixel of a numeric value; `None` on a categorical axis
    pub fn map_number(&self, value: f64) -> Option<f32> {
        match &self.scale {
            Scale::Linear(scale) => Some(scale.map(value)),
            Scale::Point(_) => None,
        }
    }

    pub fn ticks(&self, count: usize) -> Vec<Tick> {
        match &self.scale {
            Scale::Linear(scale) => {
                let step = scale.tick_step(count);
                scale
                    .ticks(count)
                    .into_iter()
                    .map(|value| Tick {
                        offset: scale.map(value),
                        label: format_tick(value, step),
                    })
                    .collect()
            }
            Scale::Point(scale) => scale
                .domain()
                .iter()
                .enumerate()
                .map(|(index, label)| Tick {
                    offset: scale.position(index),
                    label: label.clone(),
                })
                .collect(),
        }
    }
}

/// Render a tick value with no more decimals than its step needs
pub fn format_tick(value: f64, step: f64) -> String {
    let decimals = if step >= 1.0 || step <= 0.0 {
        0
    } else {
        (-step.log10()).ceil() as usize
    };
    format!("{:.*}", decimals, value)
}

/// Build the axis for `attribute` over the pixel interval `extent`.
///
/// `extent` runs along the axis; vertical axes invert it so larger values sit
/// higher. Returns `None` for an empty dataset.
pub fn build_axis(
    dataset: &Dataset,
    attribute: &str,
    extent: (f32, f32),
    orientation: Orientation,
    position: f32,
) -> Option<Axis> {
    if dataset.is_empty() {
        return None;
    }

    let range = match orientation {
        Orientation::Horizontal => extent,
        Orientation::Vertical => (extent.1, extent.0),
    };

    let descriptor = AttributeDescriptor::infer(dataset, attribute);
    let scale = match descriptor.kind {
        AttributeKind::Numeric => {
            let (min, max) = dataset
                .iter()
                .filter_map(|record| record.number(attribute))
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
            Scale::Linear(LinearScale::new((min, max), range))
        }
        AttributeKind::Categorical => {
            let labels: IndexSet<String> = dataset
                .iter()
                .map(|record| category_label(record.get(attribute)))
                .collect();
            Scale::Point(PointScale::new(labels, range))
        }
    };

    tracing::trace!("Built {:?} axis for '{}'", descriptor.kind, attribute);

    Some(Axis {
        descriptor,
        scale,
        position,
        orientation,
    })
}
