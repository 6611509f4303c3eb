//! Component vocabulary shared by validation, constraints and fallback.
//!
//! A catalog is immutable once built and is meant to be shared behind an
//! `Arc` by every concurrent generation.

use std::collections::{BTreeMap, BTreeSet};

/// Structural role a component type plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ComponentRole {
    /// Card-like wrapper expected to hold a header and a body.
    Container,
    /// Header or title region of a container.
    Header,
    /// Main content region of a container.
    Body,
    /// Something the user can interact with.
    Control,
    /// Anything else.
    Content,
}

/// Known component types, their roles and the alias table used to
/// canonicalize free-form component names.
#[derive(Debug, Clone)]
pub struct ComponentCatalog {
    roles: BTreeMap<String, ComponentRole>,
    /// compact lower-case alias -> canonical type
    aliases: BTreeMap<String, String>,
    /// prompt phrase -> canonical type
    keywords: BTreeMap<String, String>,
    text_type: String,
}

/// Lower-case, alphanumeric only: "Card Header", "card-header" and
/// "cardHeader" all compact to "cardheader".
fn compact(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

impl ComponentCatalog {
    /// Empty catalog whose literal text nodes use `text_type`.
    pub fn new(text_type: impl Into<String>) -> Self {
        let text_type = text_type.into();
        Self {
            roles: BTreeMap::new(),
            aliases: BTreeMap::new(),
            keywords: BTreeMap::new(),
            text_type: text_type.clone(),
        }
        .with_type(text_type, ComponentRole::Content)
    }

    /// Register a type. Its own name (and plural) become aliases.
    pub fn with_type(mut self, name: impl Into<String>, role: ComponentRole) -> Self {
        let name = name.into();
        let key = compact(&name);
        self.aliases.insert(format!("{}s", key), name.clone());
        self.aliases.insert(key, name.clone());
        self.roles.insert(name, role);
        self
    }

    /// Map an extra name onto a registered type.
    pub fn with_alias(mut self, alias: &str, canonical: impl Into<String>) -> Self {
        self.aliases.insert(compact(alias), canonical.into());
        self
    }

    /// Register a prompt phrase that implies `canonical`. Phrases are
    /// matched on word boundaries, case-insensitively.
    pub fn with_keyword(mut self, phrase: &str, canonical: impl Into<String>) -> Self {
        let canonical = canonical.into();
        self.aliases.insert(compact(phrase), canonical.clone());
        self.keywords.insert(phrase.to_lowercase(), canonical);
        self
    }

    /// The stock vocabulary.
    pub fn standard() -> Self {
        use ComponentRole::*;

        let mut catalog = Self::new("Text");
        for (name, role) in [
            ("Card", Container),
            ("CardHeader", Header),
            ("CardTitle", Header),
            ("CardDescription", Content),
            ("CardContent", Body),
            ("CardFooter", Content),
            ("Heading", Content),
            ("Label", Content),
            ("Badge", Content),
            ("Image", Content),
            ("Avatar", Content),
            ("Divider", Content),
            ("Progress", Content),
            ("Alert", Content),
            ("Stack", Content),
            ("Grid", Content),
            ("List", Content),
            ("Table", Content),
            ("Tabs", Content),
            ("Form", Content),
            ("Button", Control),
            ("Input", Control),
            ("Textarea", Control),
            ("Select", Control),
            ("Checkbox", Control),
            ("Switch", Control),
            ("RadioGroup", Control),
            ("Slider", Control),
            ("Link", Control),
        ] {
            catalog = catalog.with_type(name, role);
        }

        catalog = catalog
            .with_alias("title", "CardTitle")
            .with_alias("header", "CardHeader")
            .with_alias("content", "CardContent")
            .with_alias("body", "CardContent")
            .with_alias("footer", "CardFooter")
            .with_alias("paragraph", "Text")
            .with_alias("typography", "Text")
            .with_alias("textfield", "Input")
            .with_alias("textbox", "Input")
            .with_alias("img", "Image")
            .with_alias("radio", "RadioGroup")
            .with_alias("separator", "Divider")
            .with_alias("hr", "Divider");

        // Words too common in prose (text, list, form, label) are left out.
        for (phrase, canonical) in [
            ("card", "Card"),
            ("cards", "Card"),
            ("button", "Button"),
            ("buttons", "Button"),
            ("cta", "Button"),
            ("call to action", "Button"),
            ("input", "Input"),
            ("text field", "Input"),
            ("textarea", "Textarea"),
            ("dropdown", "Select"),
            ("select", "Select"),
            ("checkbox", "Checkbox"),
            ("toggle", "Switch"),
            ("switch", "Switch"),
            ("radio", "RadioGroup"),
            ("radio group", "RadioGroup"),
            ("slider", "Slider"),
            ("link", "Link"),
            ("image", "Image"),
            ("photo", "Image"),
            ("avatar", "Avatar"),
            ("badge", "Badge"),
            ("progress bar", "Progress"),
            ("table", "Table"),
            ("tabs", "Tabs"),
            ("alert", "Alert"),
        ] {
            catalog = catalog.with_keyword(phrase, canonical);
        }
        catalog
    }

    /// Canonical type for a free-form name, if the catalog knows it.
    pub fn canonicalize(&self, name: &str) -> Option<&str> {
        if let Some(known) = self.roles.get_key_value(name.trim()) {
            return Some(known.0.as_str());
        }
        let key = compact(name);
        if key.is_empty() {
            return None;
        }
        self.aliases
            .get(&key)
            .or_else(|| key.strip_suffix('s').and_then(|stem| self.aliases.get(stem)))
            .map(String::as_str)
    }

    /// Prompt phrases and the types they imply, longest phrase first.
    pub fn keywords(&self) -> Vec<(&str, &str)> {
        let mut pairs: Vec<(&str, &str)> = self
            .keywords
            .iter()
            .map(|(phrase, canonical)| (phrase.as_str(), canonical.as_str()))
            .collect();
        pairs.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then(a.0.cmp(b.0)));
        pairs
    }

    pub fn role(&self, node_type: &str) -> Option<ComponentRole> {
        self.roles.get(node_type).copied()
    }

    pub fn is_known(&self, node_type: &str) -> bool {
        self.roles.contains_key(node_type)
    }

    pub fn is_container(&self, node_type: &str) -> bool {
        self.role(node_type) == Some(ComponentRole::Container)
    }

    pub fn is_header(&self, node_type: &str) -> bool {
        self.role(node_type) == Some(ComponentRole::Header)
    }

    pub fn is_body(&self, node_type: &str) -> bool {
        self.role(node_type) == Some(ComponentRole::Body)
    }

    pub fn is_control(&self, node_type: &str) -> bool {
        self.role(node_type) == Some(ComponentRole::Control)
    }

    /// Type names with the given role, sorted.
    pub fn types_with_role(&self, role: ComponentRole) -> Vec<&str> {
        self.roles
            .iter()
            .filter(|(_, r)| **r == role)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Every registered type, for use as a validator allow-list.
    pub fn allowed_types(&self) -> BTreeSet<String> {
        self.roles.keys().cloned().collect()
    }

    /// Type used for literal text children.
    pub fn text_type(&self) -> &str {
        &self.text_type
    }
}

impl Default for ComponentCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
