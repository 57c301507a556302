//! Usable page height
//!
//! Part of the viewport is reserved for navigation chrome. The reserve is the
//! larger of a fixed minimum and a fraction of the viewport, so small screens
//! keep their fixed buffer while tall ones scale.

/// Minimum reserved height, in layout units
pub const DEFAULT_MIN_BUFFER: f64 = 200.0;

/// Reserved fraction of the viewport
pub const DEFAULT_BUFFER_FRACTION: f64 = 0.15;

/// Viewport reserve used to derive the pagination budget
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafeArea {
    /// Fixed minimum reserve
    pub min_buffer: f64,
    /// Reserve as a fraction of the viewport height
    pub buffer_fraction: f64,
}

impl Default for SafeArea {
    fn default() -> Self {
        Self {
            min_buffer: DEFAULT_MIN_BUFFER,
            buffer_fraction: DEFAULT_BUFFER_FRACTION,
        }
    }
}

impl SafeArea {
    /// Custom reserve
    pub fn new(min_buffer: f64, buffer_fraction: f64) -> Self {
        Self {
            min_buffer,
            buffer_fraction,
        }
    }

    /// Height reserved for a viewport
    pub fn reserve(&self, viewport_height: f64) -> f64 {
        self.min_buffer.max(viewport_height * self.buffer_fraction)
    }

    /// Height left for verses; never negative
    pub fn page_height_budget(&self, viewport_height: f64) -> f64 {
        (viewport_height - self.reserve(viewport_height)).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_viewport_uses_min_buffer() {
        let area = SafeArea::default();

        assert_eq!(area.reserve(800.0), 200.0);
        assert_eq!(area.page_height_budget(800.0), 600.0);
    }

    #[test]
    fn test_tall_viewport_uses_fraction() {
        let area = SafeArea::default();

        assert_eq!(area.reserve(2000.0), 300.0);
        assert_eq!(area.page_height_budget(2000.0), 1700.0);
    }

    #[test]
    fn test_budget_never_negative() {
        let area = SafeArea::default();
        assert_eq!(area.page_height_budget(120.0), 0.0);

        let custom = SafeArea::new(50.0, 0.5);
        assert_eq!(custom.page_height_budget(400.0), 200.0);
    }
}
