use crate::foundation::error::{MemecapError, MemecapResult};

/// Upper bound applied to `x_pct`/`y_pct` while a layer is dragged, so its
/// anchor always stays inside the visible canvas.
pub const PLACEMENT_MAX_PCT: f64 = 95.0;

/// Font size given to layers added with [`LayerSet::add_layer`].
pub const DEFAULT_LAYER_FONT_SIZE: f64 = 32.0;

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// A positioned text element overlaid on a template image.
pub struct TextLayer {
    /// Identifier, unique within its layer set.
    pub id: String,
    /// Caption text; may be empty while editing.
    pub text: String,
    /// Left edge as a percentage of canvas width.
    pub x_pct: f64,
    /// Top edge as a percentage of canvas height.
    pub y_pct: f64,
    /// Font size in source-image pixels, before export scaling.
    pub font_size: f64,
    /// The primary caption layer; never removable.
    #[serde(default)]
    pub locked: bool,
}

impl TextLayer {
    /// Build an unlocked layer.
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        x_pct: f64,
        y_pct: f64,
        font_size: f64,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            x_pct,
            y_pct,
            font_size,
            locked: false,
        }
    }

    /// Whether the layer has anything to draw.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
/// Ordered, editable set of layers for one idea.
pub struct LayerSet {
    layers: Vec<TextLayer>,
}

impl LayerSet {
    /// Start a set holding only the locked caption layer.
    pub fn new_with_caption(caption: impl Into<String>) -> Self {
        Self {
            layers: vec![TextLayer {
                id: "caption".to_string(),
                text: caption.into(),
                x_pct: 5.0,
                y_pct: 5.0,
                font_size: DEFAULT_LAYER_FONT_SIZE,
                locked: true,
            }],
        }
    }

    /// Wrap existing layers after checking [`LayerSet::validate`].
    pub fn from_layers(layers: Vec<TextLayer>) -> MemecapResult<Self> {
        let set = Self { layers };
        set.validate()?;
        Ok(set)
    }

    /// Layers in draw order.
    pub fn layers(&self) -> &[TextLayer] {
        &self.layers
    }

    /// Consume the set, returning its layers.
    pub fn into_layers(self) -> Vec<TextLayer> {
        self.layers
    }

    /// The locked caption layer, if present.
    pub fn locked(&self) -> Option<&TextLayer> {
        self.layers.iter().find(|l| l.locked)
    }

    /// Mutable access to the locked caption layer.
    pub fn locked_mut(&mut self) -> Option<&mut TextLayer> {
        self.layers.iter_mut().find(|l| l.locked)
    }

    /// Look up a layer by id.
    pub fn get(&self, id: &str) -> Option<&TextLayer> {
        self.layers.iter().find(|l| l.id == id)
    }

    /// Append an empty, unlocked layer and return its generated id.
    pub fn add_layer(&mut self) -> String {
        let mut n = self.layers.len();
        let id = loop {
            let candidate = format!("layer-{n}");
            if self.get(&candidate).is_none() {
                break candidate;
            }
            n += 1;
        };
        self.layers.push(TextLayer::new(
            id.clone(),
            "",
            10.0,
            50.0,
            DEFAULT_LAYER_FONT_SIZE,
        ));
        id
    }

    /// Remove an unlocked layer.
    pub fn remove_layer(&mut self, id: &str) -> MemecapResult<TextLayer> {
        let idx = self.index_of(id)?;
        if self.layers[idx].locked {
            return Err(MemecapError::validation(format!(
                "layer '{id}' is locked and cannot be removed"
            )));
        }
        Ok(self.layers.remove(idx))
    }

    /// Move a layer, clamping both coordinates into `[0, PLACEMENT_MAX_PCT]`.
    pub fn move_layer(&mut self, id: &str, x_pct: f64, y_pct: f64) -> MemecapResult<()> {
        if !x_pct.is_finite() || !y_pct.is_finite() {
            return Err(MemecapError::validation("layer position must be finite"));
        }
        let idx = self.index_of(id)?;
        let layer = &mut self.layers[idx];
        layer.x_pct = clamp_placement(x_pct);
        layer.y_pct = clamp_placement(y_pct);
        Ok(())
    }

    /// Replace a layer's text.
    pub fn set_text(&mut self, id: &str, text: impl Into<String>) -> MemecapResult<()> {
        let idx = self.index_of(id)?;
        self.layers[idx].text = text.into();
        Ok(())
    }

    /// Replace a layer's font size.
    pub fn set_font_size(&mut self, id: &str, font_size: f64) -> MemecapResult<()> {
        if !font_size.is_finite() || font_size <= 0.0 {
            return Err(MemecapError::validation("font size must be finite and > 0"));
        }
        let idx = self.index_of(id)?;
        self.layers[idx].font_size = font_size;
        Ok(())
    }

    /// Check id uniqueness, the single locked layer and numeric ranges.
    pub fn validate(&self) -> MemecapResult<()> {
        validate_layers(&self.layers)?;
        let locked = self.layers.iter().filter(|l| l.locked).count();
        if locked > 1 {
            return Err(MemecapError::validation(format!(
                "layer set has {locked} locked layers; expected at most one"
            )));
        }
        Ok(())
    }

    fn index_of(&self, id: &str) -> MemecapResult<usize> {
        self.layers
            .iter()
            .position(|l| l.id == id)
            .ok_or_else(|| MemecapError::validation(format!("unknown layer '{id}'")))
    }
}

/// Validate a raw layer list as accepted by the compositor.
pub fn validate_layers(layers: &[TextLayer]) -> MemecapResult<()> {
    let mut seen = std::collections::HashSet::new();
    for layer in layers {
        if layer.id.is_empty() {
            return Err(MemecapError::validation("layer id must be non-empty"));
        }
        if !seen.insert(layer.id.as_str()) {
            return Err(MemecapError::validation(format!(
                "duplicate layer id '{}'",
                layer.id
            )));
        }
        if !layer.x_pct.is_finite() || !layer.y_pct.is_finite() {
            return Err(MemecapError::validation(format!(
                "layer '{}' position must be finite",
                layer.id
            )));
        }
        if !layer.font_size.is_finite() || layer.font_size <= 0.0 {
            return Err(MemecapError::validation(format!(
                "layer '{}' font size must be finite and > 0",
                layer.id
            )));
        }
    }
    Ok(())
}

fn clamp_placement(pct: f64) -> f64 {
    pct.clamp(0.0, PLACEMENT_MAX_PCT)
}

#[cfg(test)]
#[path = "../../tests/unit/model/layer.rs"]
mod tests;
