//! Message components a webhook is allowed to send.
//!
//! Only link buttons and the layout components are usable without an
//! application owning the webhook, so interactive components like select
//! menus are left out.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_repr::{Deserialize_repr, Serialize_repr};
use strum_macros::Display;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum ComponentType {
    ActionRow = 1,
    Button = 2,
    Section = 9,
    TextDisplay = 10,
    Thumbnail = 11,
    MediaGallery = 12,
    File = 13,
    Separator = 14,
    Container = 17,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum ButtonStyle {
    Primary = 1,
    Secondary = 2,
    Success = 3,
    Danger = 4,
    Link = 5,
    Premium = 6,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum SeparatorSpacing {
    Small = 1,
    Large = 2,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnfurledMediaItem {
    pub url: String,
}

impl UnfurledMediaItem {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    pub components: Vec<Component>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Button {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    pub style: ButtonStyle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,
}

impl Button {
    /// The only kind of button a non-application webhook can attach
    pub fn link(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: None,
            style: ButtonStyle::Link,
            label: Some(label.into()),
            custom_id: None,
            sku_id: None,
            url: Some(url.into()),
            disabled: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    pub components: Vec<Component>,
    pub accessory: Box<Component>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextDisplay {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thumbnail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub media: UnfurledMediaItem,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub spoiler: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaGalleryItem {
    pub media: UnfurledMediaItem,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub spoiler: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaGallery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    pub items: Vec<MediaGalleryItem>,
}

/// References an uploaded attachment through `attachment://<filename>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileComponent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    pub file: UnfurledMediaItem,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub spoiler: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Separator {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub divider: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spacing: Option<SeparatorSpacing>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Container {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    pub components: Vec<Component>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accent_color: Option<u32>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub spoiler: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Component {
    ActionRow(ActionRow),
    Button(Button),
    Section(Section),
    TextDisplay(TextDisplay),
    Thumbnail(Thumbnail),
    MediaGallery(MediaGallery),
    File(FileComponent),
    Separator(Separator),
    Container(Container),
}

impl Component {
    pub fn kind(&self) -> ComponentType {
        match self {
            Component::ActionRow(_) => ComponentType::ActionRow,
            Component::Button(_) => ComponentType::Button,
            Component::Section(_) => ComponentType::Section,
            Component::TextDisplay(_) => ComponentType::TextDisplay,
            Component::Thumbnail(_) => ComponentType::Thumbnail,
            Component::MediaGallery(_) => ComponentType::MediaGallery,
            Component::File(_) => ComponentType::File,
            Component::Separator(_) => ComponentType::Separator,
            Component::Container(_) => ComponentType::Container,
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Component::TextDisplay(TextDisplay {
            id: None,
            content: content.into(),
        })
    }
}

/// Writes the variant's own fields with the integer discriminant next to them
#[derive(Serialize)]
struct Tagged<'a, T> {
    #[serde(rename = "type")]
    kind: ComponentType,
    #[serde(flatten)]
    inner: &'a T,
}

fn tagged<'a, T: Serialize, S: Serializer>(
    kind: ComponentType,
    inner: &'a T,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    Tagged { kind, inner }.serialize(serializer)
}

impl Serialize for Component {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let kind = self.kind();
        match self {
            Component::ActionRow(c) => tagged(kind, c, serializer),
            Component::Button(c) => tagged(kind, c, serializer),
            Component::Section(c) => tagged(kind, c, serializer),
            Component::TextDisplay(c) => tagged(kind, c, serializer),
            Component::Thumbnail(c) => tagged(kind, c, serializer),
            Component::MediaGallery(c) => tagged(kind, c, serializer),
            Component::File(c) => tagged(kind, c, serializer),
            Component::Separator(c) => tagged(kind, c, serializer),
            Component::Container(c) => tagged(kind, c, serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Component {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut value = serde_json::Value::deserialize(deserializer)?;
        let kind = value
            .as_object_mut()
            .and_then(|object| object.remove("type"))
            .ok_or_else(|| D::Error::missing_field("type"))?;
        let kind: ComponentType = serde_json::from_value(kind).map_err(D::Error::custom)?;
        let component = match kind {
            ComponentType::ActionRow => serde_json::from_value(value).map(Component::ActionRow),
            ComponentType::Button => serde_json::from_value(value).map(Component::Button),
            ComponentType::Section => serde_json::from_value(value).map(Component::Section),
            ComponentType::TextDisplay => {
                serde_json::from_value(value).map(Component::TextDisplay)
            }
            ComponentType::Thumbnail => serde_json::from_value(value).map(Component::Thumbnail),
            ComponentType::MediaGallery => {
                serde_json::from_value(value).map(Component::MediaGallery)
            }
            ComponentType::File => serde_json::from_value(value).map(Component::File),
            ComponentType::Separator => serde_json::from_value(value).map(Component::Separator),
            ComponentType::Container => serde_json::from_value(value).map(Component::Container),
        };
        component.map_err(D::Error::custom)
    }
}

impl From<ActionRow> for Component {
    fn from(row: ActionRow) -> Self {
        Component::ActionRow(row)
    }
}

impl From<Button> for Component {
    fn from(button: Button) -> Self {
        Component::Button(button)
    }
}

impl From<Container> for Component {
    fn from(container: Container) -> Self {
        Component::Container(container)
    }
}
