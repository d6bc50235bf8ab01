use crate::model::Layout;
use crate::sys::geometry::{Point, Rect, RectExt};

/// What the engine needs to know about the host's on-screen arrangement.
pub trait ContainerGeometry {
    fn container_width(&self) -> f64;

    fn group_count(&self) -> usize;

    fn group_rect(&self, group: usize) -> Option<Rect>;

    /// The strip holding the group's tab handles.
    fn header_rect(&self, group: usize) -> Option<Rect>;

    /// Tab handle bounds in tab order; empty for an unknown group.
    fn tab_rects(&self, group: usize) -> Vec<Rect>;

    fn group_at(&self, point: Point) -> Option<usize> {
        (0..self.group_count())
            .find(|&g| self.group_rect(g).is_some_and(|rect| rect.contains(point)))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GroupGeometry {
    pub rect: Rect,
    pub header: Rect,
    pub tabs: Vec<Rect>,
}

/// Geometry derived from a layout's width vector, for headless use.
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutGeometry {
    container: Rect,
    groups: Vec<GroupGeometry>,
}

impl LayoutGeometry {
    pub fn compute(layout: &Layout, container: Rect, header_height: f64, tab_width: f64) -> Self {
        let mut x = container.left();
        let header_height = header_height.min(container.size.height);
        let groups = layout
            .groups()
            .iter()
            .zip(layout.widths())
            .map(|(group, pct)| {
                let width = container.size.width * pct / 100.0;
                let rect = Rect::new(x, container.origin.y, width, container.size.height);
                let header = Rect::new(x, container.origin.y, width, header_height);
                let handle = tab_width.min(width / group.len().max(1) as f64);
                let tabs = (0..group.len())
                    .map(|i| Rect::new(x + handle * i as f64, container.origin.y, handle, header_height))
                    .collect();
                x += width;
                GroupGeometry { rect, header, tabs }
            })
            .collect();
        Self { container, groups }
    }

    pub fn container(&self) -> Rect { self.container }

    pub fn groups(&self) -> &[GroupGeometry] { &self.groups }

    /// X coordinate of the divider to the right of `divider`'s group.
    pub fn divider_x(&self, divider: usize) -> Option<f64> {
        if divider + 1 >= self.groups.len() {
            return None;
        }
        Some(self.groups[divider].rect.right())
    }
}

impl ContainerGeometry for LayoutGeometry {
    fn container_width(&self) -> f64 { self.container.size.width }

    fn group_count(&self) -> usize { self.groups.len() }

    fn group_rect(&self, group: usize) -> Option<Rect> { self.groups.get(group).map(|g| g.rect) }

    fn header_rect(&self, group: usize) -> Option<Rect> { self.groups.get(group).map(|g| g.header) }

    fn tab_rects(&self, group: usize) -> Vec<Rect> {
        self.groups.get(group).map(|g| g.tabs.clone()).unwrap_or_default()
    }
}
