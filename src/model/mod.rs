/// Text layers and the editable layer set.
pub mod layer;
/// Templates, inline images and idea sets.
pub mod template;
