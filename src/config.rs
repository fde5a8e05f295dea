//! Configuration for dsforge
//!
//! Finder window presentation settings stamped by the layout driver.

use crate::btree::FourCC;

/// Window presentation settings for the forged folder view
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Window Geometry
    // -------------------------------------------------------------------------
    /// Screen coordinate of the window's top edge
    pub window_top: u16,

    /// Screen coordinate of the window's left edge
    pub window_left: u16,

    // -------------------------------------------------------------------------
    // View Options
    // -------------------------------------------------------------------------
    /// Finder view style tag written into `fwi0` (`icnv` = icon view)
    pub view_style: FourCC,

    /// Icon arrangement tag written into `icvo` (`none` keeps free placement)
    pub arrange_by: FourCC,

    /// Label position tag written into `icvo` (`botm` or `rght`)
    pub label_position: FourCC,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window_top: 200,
            window_left: 300,
            view_style: *b"icnv",
            arrange_by: *b"none",
            label_position: *b"botm",
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the window's top edge
    pub fn window_top(mut self, top: u16) -> Self {
        self.config.window_top = top;
        self
    }

    /// Set the window's left edge
    pub fn window_left(mut self, left: u16) -> Self {
        self.config.window_left = left;
        self
    }

    /// Set the Finder view style tag
    pub fn view_style(mut self, tag: FourCC) -> Self {
        self.config.view_style = tag;
        self
    }

    /// Set the icon arrangement tag
    pub fn arrange_by(mut self, tag: FourCC) -> Self {
        self.config.arrange_by = tag;
        self
    }

    /// Set the label position tag
    pub fn label_position(mut self, tag: FourCC) -> Self {
        self.config.label_position = tag;
        self
    }

    /// Finish building and return the config
    pub fn build(self) -> Config {
        self.config
    }
}
