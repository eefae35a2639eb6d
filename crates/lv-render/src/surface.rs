//! Retained graphical surface
//!
//! A surface is a flat, ordered list of elements in plot coordinates. Elements
//! keep their id for as long as they live, so a caller can move an existing
//! element instead of replacing it. Moves may be animated.

use egui::{Align2, Color32, Pos2, Rect, Stroke, Vec2};
use indexmap::IndexMap;

use crate::Renderer;

/// Stable handle to an element on a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(u64);

/// Role of an element; used for bulk removal and hit testing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// A data mark bound to one record
    Mark,
    /// Axis line
    Axis,
    /// Tick line or tick label
    Tick,
    /// Axis title
    Label,
    /// Invisible area that receives brush gestures
    BrushOverlay,
    /// The visible extent of an active brush
    BrushSelection,
}

/// Geometry of an element
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Circle { center: Pos2, radius: f32 },
    Polyline { points: Vec<Pos2> },
    Segment { from: Pos2, to: Pos2 },
    Rect { rect: Rect },
    Text { position: Pos2, text: String, anchor: Align2, size: f32 },
}

impl Primitive {
    /// Interpolate toward `to`; mismatched shapes jump to `to`
    pub fn lerp(&self, to: &Primitive, t: f32) -> Primitive {
        match (self, to) {
            (
                Primitive::Circle { center: a, radius: ra },
                Primitive::Circle { center: b, radius: rb },
            ) => Primitive::Circle {
                center: lerp_pos(*a, *b, t),
                radius: ra + (rb - ra) * t,
            },
            (Primitive::Polyline { points: a }, Primitive::Polyline { points: b }) if a.len() == b.len() => {
                Primitive::Polyline {
                    points: a.iter().zip(b).map(|(p, q)| lerp_pos(*p, *q, t)).collect(),
                }
            }
            (Primitive::Segment { from: a0, to: a1 }, Primitive::Segment { from: b0, to: b1 }) => {
                Primitive::Segment {
                    from: lerp_pos(*a0, *b0, t),
                    to: lerp_pos(*a1, *b1, t),
                }
            }
            (Primitive::Rect { rect: a }, Primitive::Rect { rect: b }) => Primitive::Rect {
                rect: Rect::from_min_max(lerp_pos(a.min, b.min, t), lerp_pos(a.max, b.max, t)),
            },
            _ => to.clone(),
        }
    }

    /// Pixel distance from `point` to the primitive's outline or area
    pub fn distance_to(&self, point: Pos2) -> f32 {
        match self {
            Primitive::Circle { center, radius } => (center.distance(point) - radius).max(0.0),
            Primitive::Polyline { points } => points
                .windows(2)
                .map(|w| distance_to_segment(point, w[0], w[1]))
                .fold(f32::INFINITY, f32::min),
            Primitive::Segment { from, to } => distance_to_segment(point, *from, *to),
            Primitive::Rect { rect } => {
                let clamped = Pos2::new(
                    point.x.max(rect.min.x).min(rect.max.x),
                    point.y.max(rect.min.y).min(rect.max.y),
                );
                clamped.distance(point)
            }
            Primitive::Text { .. } => f32::INFINITY,
        }
    }

    fn translated(&self, offset: Vec2) -> Primitive {
        match self {
            Primitive::Circle { center, radius } => Primitive::Circle {
                center: *center + offset,
                radius: *radius,
            },
            Primitive::Polyline { points } => Primitive::Polyline {
                points: points.iter().map(|p| *p + offset).collect(),
            },
            Primitive::Segment { from, to } => Primitive::Segment {
                from: *from + offset,
                to: *to + offset,
            },
            Primitive::Rect { rect } => Primitive::Rect {
                rect: rect.translate(offset),
            },
            Primitive::Text { position, text, anchor, size } => Primitive::Text {
                position: *position + offset,
                text: text.clone(),
                anchor: *anchor,
                size: *size,
            },
        }
    }
}

fn lerp_pos(a: Pos2, b: Pos2, t: f32) -> Pos2 {
    a + (b - a) * t
}

// Distance from point to line segment
fn distance_to_segment(point: Pos2, a: Pos2, b: Pos2) -> f32 {
    let ab = b - a;
    let ap = point - a;
    let ab_squared = ab.x * ab.x + ab.y * ab.y;

    if ab_squared == 0.0 {
        return ap.length();
    }

    let t = ((ap.x * ab.x + ap.y * ab.y) / ab_squared).clamp(0.0, 1.0);
    let projection = a + ab * t;
    (point - projection).length()
}

/// Visual emphasis of an element
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Style {
    /// Fill for circles and rectangles, colour for text
    pub fill: Color32,
    pub stroke: Stroke,
    /// Multiplies every colour of the element
    pub opacity: f32,
}

impl Style {
    pub fn new(fill: Color32, stroke: Stroke, opacity: f32) -> Self {
        Self { fill, stroke, opacity }
    }

    pub fn stroked(stroke: Stroke) -> Self {
        Self::new(Color32::TRANSPARENT, stroke, 1.0)
    }

    pub fn hidden() -> Self {
        Self::new(Color32::TRANSPARENT, Stroke::NONE, 0.0)
    }
}

#[derive(Debug, Clone)]
struct Transition {
    from: Primitive,
    to: Primitive,
    elapsed: f32,
    duration: f32,
}

/// One element of a surface
#[derive(Debug, Clone)]
pub struct Element {
    id: ElementId,
    kind: ElementKind,
    key: Option<usize>,
    primitive: Primitive,
    style: Style,
    transition: Option<Transition>,
}

impl Element {
    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    /// Datum key bound at insertion, if any
    pub fn key(&self) -> Option<usize> {
        self.key
    }

    /// Geometry as currently displayed
    pub fn primitive(&self) -> &Primitive {
        &self.primitive
    }

    /// Geometry the element ends up at once any transition finishes
    pub fn target(&self) -> &Primitive {
        self.transition
            .as_ref()
            .map(|t| &t.to)
            .unwrap_or(&self.primitive)
    }

    pub fn style(&self) -> &Style {
        &self.style
    }

    pub fn is_animating(&self) -> bool {
        self.transition.is_some()
    }

    fn advance(&mut self, dt: f32) {
        if let Some(transition) = &mut self.transition {
            transition.elapsed += dt;
            if transition.elapsed >= transition.duration {
                self.primitive = transition.to.clone();
                self.transition = None;
            } else {
                let t = ease_cubic_in_out(transition.elapsed / transition.duration);
                self.primitive = transition.from.lerp(&transition.to, t);
            }
        }
    }
}

/// Cubic ease-in-out over `[0, 1]`
pub fn ease_cubic_in_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// Retained set of elements owned by a single engine
#[derive(Debug, Clone)]
pub struct Surface {
    size: Vec2,
    origin: Vec2,
    elements: IndexMap<ElementId, Element>,
    next_id: u64,
}

impl Surface {
    /// Create a surface of `size` whose plot coordinates start at `origin`
    pub fn new(size: Vec2, origin: Vec2) -> Self {
        Self {
            size,
            origin,
            elements: IndexMap::new(),
            next_id: 0,
        }
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    /// Convert a surface position into plot coordinates
    pub fn to_plot(&self, position: Pos2) -> Pos2 {
        position - self.origin
    }

    pub fn insert(&mut self, kind: ElementKind, primitive: Primitive, style: Style) -> ElementId {
        self.insert_element(kind, None, primitive, style)
    }

    /// Insert an element bound to a datum key
    pub fn insert_keyed(&mut self, kind: ElementKind, key: usize, primitive: Primitive, style: Style) -> ElementId {
        self.insert_element(kind, Some(key), primitive, style)
    }

    fn insert_element(&mut self, kind: ElementKind, key: Option<usize>, primitive: Primitive, style: Style) -> ElementId {
        let id = ElementId(self.next_id);
        self.next_id += 1;
        self.elements.insert(
            id,
            Element {
                id,
                kind,
                key,
                primitive,
                style,
                transition: None,
            },
        );
        id
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(&id)
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.elements.contains_key(&id)
    }

    pub fn remove(&mut self, id: ElementId) -> Option<Element> {
        self.elements.shift_remove(&id)
    }

    /// Remove every element of a kind; returns how many were removed
    pub fn remove_kind(&mut self, kind: ElementKind) -> usize {
        let before = self.elements.len();
        self.elements.retain(|_, element| element.kind != kind);
        before - self.elements.len()
    }

    /// Move an element to new geometry, animated over `duration` seconds
    pub fn transition_to(&mut self, id: ElementId, primitive: Primitive, duration: f32) -> bool {
        let Some(element) = self.elements.get_mut(&id) else {
            return false;
        };

        if duration <= 0.0 {
            element.primitive = primitive;
            element.transition = None;
        } else {
            element.transition = Some(Transition {
                from: element.primitive.clone(),
                to: primitive,
                elapsed: 0.0,
                duration,
            });
        }
        true
    }

    /// Replace geometry immediately
    pub fn set_primitive(&mut self, id: ElementId, primitive: Primitive) -> bool {
        self.transition_to(id, primitive, 0.0)
    }

    pub fn set_style(&mut self, id: ElementId, style: Style) -> bool {
        match self.elements.get_mut(&id) {
            Some(element) => {
                element.style = style;
                true
            }
            None => false,
        }
    }

    /// Advance running transitions; returns true while any is still running
    pub fn advance(&mut self, dt: f32) -> bool {
        let mut animating = false;
        for element in self.elements.values_mut() {
            element.advance(dt);
            animating |= element.is_animating();
        }
        animating
    }

    pub fn is_animating(&self) -> bool {
        self.elements.values().any(Element::is_animating)
    }

    /// Topmost element of `kind` within `tolerance` pixels of a plot position
    pub fn hit_test(&self, kind: ElementKind, position: Pos2, tolerance: f32) -> Option<&Element> {
        self.elements
            .values()
            .rev()
            .filter(|element| element.kind == kind && element.style.opacity > 0.0)
            .map(|element| (element, element.target().distance_to(position)))
            .filter(|(_, distance)| *distance <= tolerance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(element, _)| element)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.elements.values()
    }

    pub fn iter_kind(&self, kind: ElementKind) -> impl Iterator<Item = &Element> {
        self.elements.values().filter(move |element| element.kind == kind)
    }

    pub fn count_kind(&self, kind: ElementKind) -> usize {
        self.iter_kind(kind).count()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Remove every element
    pub fn clear(&mut self) {
        self.elements.clear();
    }

    /// Paint every visible element in insertion order
    pub fn draw(&self, renderer: &mut dyn Renderer) {
        renderer.begin_frame();

        for element in self.elements.values() {
            let style = element.style;
            if style.opacity <= 0.0 {
                continue;
            }

            let fill = style.fill.gamma_multiply(style.opacity);
            let stroke = Stroke::new(style.stroke.width, style.stroke.color.gamma_multiply(style.opacity));

            match element.primitive.translated(self.origin) {
                Primitive::Circle { center, radius } => renderer.draw_circle(center, radius, fill, stroke),
                Primitive::Polyline { points } => renderer.draw_polyline(&points, stroke),
                Primitive::Segment { from, to } => renderer.draw_polyline(&[from, to], stroke),
                Primitive::Rect { rect } => renderer.draw_rect(rect, fill, stroke),
                Primitive::Text { position, text, anchor, size } => {
                    renderer.draw_text(&text, position, anchor, fill, size)
                }
            }
        }

        renderer.end_frame();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingRenderer {
        frames: usize,
        circles: Vec<Pos2>,
        polylines: usize,
        texts: usize,
    }

    impl Renderer for CountingRenderer {
        fn begin_frame(&mut self) {
            self.frames += 1;
        }

        fn end_frame(&mut self) {}

        fn draw_polyline(&mut self, _points: &[Pos2], _stroke: Stroke) {
            self.polylines += 1;
        }

        fn draw_circle(&mut self, center: Pos2, _radius: f32, _fill: Color32, _stroke: Stroke) {
            self.circles.push(center);
        }

        fn draw_rect(&mut self, _rect: Rect, _fill: Color32, _stroke: Stroke) {}

        fn draw_text(&mut self, _text: &str, _position: Pos2, _anchor: Align2, _color: Color32, _size: f32) {
            self.texts += 1;
        }
    }

    fn dot(x: f32, y: f32) -> Primitive {
        Primitive::Circle {
            center: Pos2::new(x, y),
            radius: 3.0,
        }
    }

    fn visible() -> Style {
        Style::new(Color32::BLUE, Stroke::NONE, 1.0)
    }

    #[test]
    fn test_ids_are_never_reused() {
        let mut surface = Surface::new(Vec2::new(100.0, 100.0), Vec2::ZERO);
        let a = surface.insert(ElementKind::Mark, dot(0.0, 0.0), visible());
        surface.remove(a);
        let b = surface.insert(ElementKind::Mark, dot(0.0, 0.0), visible());

        assert_ne!(a, b);
        assert!(!surface.contains(a));
        assert_eq!(surface.len(), 1);
    }

    #[test]
    fn test_transition_reaches_target() {
        let mut surface = Surface::new(Vec2::new(100.0, 100.0), Vec2::ZERO);
        let id = surface.insert(ElementKind::Mark, dot(0.0, 0.0), visible());
        surface.transition_to(id, dot(10.0, 20.0), 1.0);

        assert!(surface.advance(0.5));
        let Primitive::Circle { center, .. } = surface.get(id).unwrap().primitive().clone() else {
            panic!("expected a circle");
        };
        assert!((center.x - 5.0).abs() < 1e-4);
        assert_eq!(surface.get(id).unwrap().target(), &dot(10.0, 20.0));

        assert!(!surface.advance(0.6));
        assert_eq!(surface.get(id).unwrap().primitive(), &dot(10.0, 20.0));
    }

    #[test]
    fn test_remove_kind() {
        let mut surface = Surface::new(Vec2::new(100.0, 100.0), Vec2::ZERO);
        surface.insert(ElementKind::Axis, Primitive::Segment { from: Pos2::ZERO, to: Pos2::new(0.0, 10.0) }, visible());
        surface.insert(ElementKind::Mark, dot(1.0, 1.0), visible());
        surface.insert(ElementKind::Mark, dot(2.0, 2.0), visible());

        assert_eq!(surface.remove_kind(ElementKind::Mark), 2);
        assert_eq!(surface.count_kind(ElementKind::Axis), 1);
    }

    #[test]
    fn test_hit_test_prefers_nearest_mark() {
        let mut surface = Surface::new(Vec2::new(100.0, 100.0), Vec2::ZERO);
        surface.insert_keyed(ElementKind::Mark, 1, dot(10.0, 10.0), visible());
        surface.insert_keyed(ElementKind::Mark, 2, dot(14.0, 10.0), visible());

        let hit = surface.hit_test(ElementKind::Mark, Pos2::new(15.0, 10.0), 2.0);
        assert_eq!(hit.and_then(Element::key), Some(2));
        assert!(surface.hit_test(ElementKind::Mark, Pos2::new(50.0, 50.0), 2.0).is_none());
    }

    #[test]
    fn test_polyline_distance() {
        let line = Primitive::Polyline {
            points: vec![Pos2::new(0.0, 0.0), Pos2::new(10.0, 0.0), Pos2::new(10.0, 10.0)],
        };
        assert_eq!(line.distance_to(Pos2::new(5.0, 3.0)), 3.0);
        assert_eq!(line.distance_to(Pos2::new(12.0, 5.0)), 2.0);
    }

    #[test]
    fn test_draw_offsets_by_origin_and_skips_hidden() {
        let mut surface = Surface::new(Vec2::new(100.0, 100.0), Vec2::new(10.0, 20.0));
        surface.insert(ElementKind::Mark, dot(1.0, 1.0), visible());
        surface.insert(ElementKind::BrushOverlay, Primitive::Rect { rect: Rect::from_min_size(Pos2::ZERO, Vec2::splat(5.0)) }, Style::hidden());

        let mut renderer = CountingRenderer::default();
        surface.draw(&mut renderer);

        assert_eq!(renderer.frames, 1);
        assert_eq!(renderer.circles, vec![Pos2::new(11.0, 21.0)]);
        assert_eq!(renderer.polylines, 0);
        assert_eq!(renderer.texts, 0);
    }
}
