//! Visualization property set attached to every scene object.

use shared::Color;

use super::viewports::{ViewportId, ViewportMask, ViewportProperty};

/// Default palette
pub struct SceneColors;

impl SceneColors {
    pub const SELECTED_MESH: Color = Color::rgb(255, 190, 70);
    pub const UNSELECTED_MESH: Color = Color::rgb(190, 195, 205);
    pub const BACK_FACES: Color = Color::rgb(110, 95, 130);
    pub const EDGES: Color = Color::rgb(25, 25, 30);
    pub const POINTS: Color = Color::rgb(60, 70, 220);
}

/// Boolean visualization switches, each kept as a viewport mask
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VisualProperty {
    Edges,
    Points,
    Transparency,
    FlatShading,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VisualizationPropertySet {
    show_edges: ViewportMask,
    show_points: ViewportMask,
    transparency: ViewportMask,
    flat_shading: ViewportMask,
    front_color_selected: ViewportProperty<Color>,
    front_color_unselected: ViewportProperty<Color>,
    back_color: ViewportProperty<Color>,
    edges_color: ViewportProperty<Color>,
    points_color: ViewportProperty<Color>,
    needs_redraw: bool,
}

impl Default for VisualizationPropertySet {
    fn default() -> Self {
        Self {
            show_edges: ViewportMask::NONE,
            show_points: ViewportMask::NONE,
            transparency: ViewportMask::NONE,
            flat_shading: ViewportMask::NONE,
            front_color_selected: ViewportProperty::new(SceneColors::SELECTED_MESH),
            front_color_unselected: ViewportProperty::new(SceneColors::UNSELECTED_MESH),
            back_color: ViewportProperty::new(SceneColors::BACK_FACES),
            edges_color: ViewportProperty::new(SceneColors::EDGES),
            points_color: ViewportProperty::new(SceneColors::POINTS),
            needs_redraw: true,
        }
    }
}

impl VisualizationPropertySet {
    fn mask(&self, prop: VisualProperty) -> ViewportMask {
        match prop {
            VisualProperty::Edges => self.show_edges,
            VisualProperty::Points => self.show_points,
            VisualProperty::Transparency => self.transparency,
            VisualProperty::FlatShading => self.flat_shading,
        }
    }

    fn mask_mut(&mut self, prop: VisualProperty) -> &mut ViewportMask {
        match prop {
            VisualProperty::Edges => &mut self.show_edges,
            VisualProperty::Points => &mut self.show_points,
            VisualProperty::Transparency => &mut self.transparency,
            VisualProperty::FlatShading => &mut self.flat_shading,
        }
    }

    pub fn property(&self, prop: VisualProperty, viewport: ViewportId) -> bool {
        self.mask(prop).contains(viewport)
    }

    pub fn property_mask(&self, prop: VisualProperty) -> ViewportMask {
        self.mask(prop)
    }

    pub fn set_property(&mut self, prop: VisualProperty, on: bool, viewports: ViewportMask) {
        let mut mask = self.mask(prop);
        mask.set(viewports, on);
        if mask != self.mask(prop) {
            *self.mask_mut(prop) = mask;
            self.needs_redraw = true;
        }
    }

    pub fn front_color(&self, selected: bool, viewport: ViewportId) -> Color {
        if selected {
            *self.front_color_selected.get(viewport)
        } else {
            *self.front_color_unselected.get(viewport)
        }
    }

    pub fn set_front_color(&mut self, color: Color, selected: bool, viewport: Option<ViewportId>) {
        let prop = if selected {
            &mut self.front_color_selected
        } else {
            &mut self.front_color_unselected
        };
        if prop.set(color, viewport) {
            self.needs_redraw = true;
        }
    }

    pub fn back_color(&self, viewport: ViewportId) -> Color {
        *self.back_color.get(viewport)
    }

    pub fn set_back_color(&mut self, color: Color, viewport: Option<ViewportId>) {
        if self.back_color.set(color, viewport) {
            self.needs_redraw = true;
        }
    }

    pub fn edges_color(&self, viewport: ViewportId) -> Color {
        *self.edges_color.get(viewport)
    }

    pub fn set_edges_color(&mut self, color: Color, viewport: Option<ViewportId>) {
        if self.edges_color.set(color, viewport) {
            self.needs_redraw = true;
        }
    }

    pub fn points_color(&self, viewport: ViewportId) -> Color {
        *self.points_color.get(viewport)
    }

    pub fn set_points_color(&mut self, color: Color, viewport: Option<ViewportId>) {
        if self.points_color.set(color, viewport) {
            self.needs_redraw = true;
        }
    }

    pub fn redraw_flag(&self) -> bool {
        self.needs_redraw
    }

    pub fn set_redraw_flag(&mut self) {
        self.needs_redraw = true;
    }

    pub fn reset_redraw_flag(&mut self) {
        self.needs_redraw = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let v = VisualizationPropertySet::default();
        assert!(!v.property(VisualProperty::Edges, ViewportId::MAIN));
        assert!(!v.property(VisualProperty::FlatShading, ViewportId::MAIN));
        assert_eq!(v.edges_color(ViewportId::MAIN), SceneColors::EDGES);
        assert!(v.redraw_flag());
    }

    #[test]
    fn test_setter_marks_redraw_only_on_change() {
        let mut v = VisualizationPropertySet::default();
        v.reset_redraw_flag();

        v.set_property(VisualProperty::Edges, false, ViewportMask::ALL);
        assert!(!v.redraw_flag());

        v.set_property(VisualProperty::Edges, true, ViewportMask::ALL);
        assert!(v.redraw_flag());
        assert!(v.property(VisualProperty::Edges, ViewportId::MAIN));

        v.reset_redraw_flag();
        v.set_edges_color(SceneColors::EDGES, None);
        assert!(!v.redraw_flag());
        v.set_points_color(Color::rgb(1, 2, 3), None);
        assert!(v.redraw_flag());
    }

    #[test]
    fn test_front_color_by_selection() {
        let mut v = VisualizationPropertySet::default();
        v.set_front_color(Color::rgb(1, 1, 1), false, None);
        assert_eq!(v.front_color(false, ViewportId::MAIN), Color::rgb(1, 1, 1));
        assert_eq!(v.front_color(true, ViewportId::MAIN), SceneColors::SELECTED_MESH);
    }
}
