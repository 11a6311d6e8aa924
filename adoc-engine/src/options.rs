use crate::model::{AttributeValue, Attributes};

/// Options recognised by [`crate::parse`].
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct Options {
    /// Name of the source, only used in error messages.
    pub filename: Option<String>,
    /// Attributes set before the first declaration of the source is read.
    pub attributes: Attributes,
    /// Added to every section level (for sources that get included one level
    /// down).
    pub level_offset: isize,
}

impl Options {
    /// Create a new `OptionsBuilder` for fluent configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use adoc_engine::Options;
    ///
    /// let options = Options::builder()
    ///     .with_filename("guide.adoc")
    ///     .with_attribute("imagesdir", "images")
    ///     .with_level_offset(1)
    ///     .build();
    /// ```
    #[must_use]
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder::default()
    }

    /// Create a new `Options` with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new `Options` with the given attribute overrides.
    #[must_use]
    pub fn with_attributes(attributes: Attributes) -> Self {
        Self {
            attributes,
            ..Default::default()
        }
    }
}

/// Builder for [`Options`].
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct OptionsBuilder {
    filename: Option<String>,
    attributes: Attributes,
    level_offset: isize,
}

impl OptionsBuilder {
    /// Set the source name reported in errors.
    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Add an attribute override.
    ///
    /// # Example
    ///
    /// ```
    /// use adoc_engine::Options;
    ///
    /// let options = Options::builder()
    ///     .with_attribute("product", "Widget")
    ///     .with_attribute("experimental", true)
    ///     .build();
    /// assert_eq!(options.attributes.get_str("product"), Some("Widget"));
    /// ```
    #[must_use]
    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.attributes.insert(name, value);
        self
    }

    /// Set the section level offset.
    #[must_use]
    pub fn with_level_offset(mut self, offset: isize) -> Self {
        self.level_offset = offset;
        self
    }

    #[must_use]
    pub fn build(self) -> Options {
        Options {
            filename: self.filename,
            attributes: self.attributes,
            level_offset: self.level_offset,
        }
    }
}
