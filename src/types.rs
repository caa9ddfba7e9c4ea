use thiserror::Error;

use crate::depends;

/// Errors from which the generator cannot recover.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FatalError {
    #[error("document does not contain a <registry> element")]
    MissingRegistryElement,

    #[error("unable to read registry: {0}")]
    IoError(#[from] std::io::Error),

    #[error("malformed XML: {0}")]
    XmlError(#[from] xml::reader::Error),

    #[error("malformed registry document: {first} ({} more)", .rest.len())]
    Malformed { first: Error, rest: Vec<Error> },

    #[error("invalid registry model: {0}")]
    InvalidModel(#[from] Error),
}

impl FatalError {
    pub(crate) fn malformed(mut errors: Vec<Error>) -> Option<FatalError> {
        if errors.is_empty() {
            return None;
        }
        let first = errors.remove(0);
        Some(FatalError::Malformed {
            first,
            rest: errors,
        })
    }
}

/// Problems found in the registry. The parser collects these with the xpath
/// of the offending element; the model builder reports them directly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("{xpath}: missing element <{name}>")]
    MissingElement { xpath: String, name: String },

    #[error("{xpath}: missing attribute '{name}'")]
    MissingAttribute { xpath: String, name: String },

    #[error("dependency of '{owner}': {source}")]
    DependencyExpression {
        owner: String,
        source: depends::ParseError,
    },

    #[error("'{owner}' requires unknown command '{name}'")]
    UnknownCommand { owner: String, name: String },

    #[error("extension '{extension}' names unknown platform '{platform}'")]
    UnknownPlatform { extension: String, platform: String },

    #[error("command '{name}' is defined more than once")]
    DuplicateCommand { name: String },

    #[error("internal parser error: {desc}")]
    Internal { desc: &'static str },
}

/// The parts of a Vulkan registry document the generator consumes, in
/// document order.
///
/// Several documents (the core registry and the video registry, for
/// example) can be combined with [`Registry::extend`] before building the
/// model.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct Registry(pub Vec<RegistryChild>);

impl Registry {
    /// Appends the top-level children of `other` after those of `self`.
    pub fn extend(&mut self, other: Registry) {
        self.0.extend(other.0);
    }

    pub fn platforms(&self) -> impl Iterator<Item = &Platform> {
        self.0.iter().flat_map(|child| match child {
            RegistryChild::Platforms(platforms) => platforms.as_slice(),
            _ => &[],
        })
    }

    pub fn types(&self) -> impl Iterator<Item = &Type> {
        self.0.iter().flat_map(|child| match child {
            RegistryChild::Types(types) => types.as_slice(),
            _ => &[],
        })
    }

    pub fn commands(&self) -> impl Iterator<Item = &Command> {
        self.0.iter().flat_map(|child| match child {
            RegistryChild::Commands(commands) => commands.as_slice(),
            _ => &[],
        })
    }

    pub fn features(&self) -> impl Iterator<Item = &Feature> {
        self.0.iter().filter_map(|child| match child {
            RegistryChild::Feature(feature) => Some(feature),
            _ => None,
        })
    }

    pub fn extensions(&self) -> impl Iterator<Item = &Extension> {
        self.0.iter().flat_map(|child| match child {
            RegistryChild::Extensions(extensions) => extensions.as_slice(),
            _ => &[],
        })
    }
}

/// An element of the Vulkan registry that the generator keeps.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[non_exhaustive]
pub enum RegistryChild {
    /// List of supported Vulkan platforms.
    Platforms(Vec<Platform>),

    /// Type definitions.
    Types(Vec<Type>),

    /// Commands are the Vulkan API's name for functions.
    Commands(Vec<Command>),

    /// Feature level of the API, such as Vulkan 1.0 or 1.1
    Feature(Feature),

    /// Container for all published Vulkan specification extensions.
    Extensions(Vec<Extension>),
}

/// A platform refers to a windowing system which Vulkan can use.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct Platform {
    /// Short identifier.
    pub name: String,

    /// C macro name which is used to guard platform-specific definitions.
    pub protect: String,
}

/// A `<type>` element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct Type {
    /// Taken from the `name` attribute, or from the `<name>` child when the
    /// attribute is absent.
    pub name: String,
    pub category: Option<String>,
    pub api: Option<String>,
    pub supported: Option<String>,
    pub members: Vec<TypeMember>,
}

/// A `<member>` of a struct or union type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct TypeMember {
    pub api: Option<String>,
    pub type_name: Option<String>,
    pub name: Option<String>,

    /// All text of the member declaration, comments excluded.
    pub code: String,

    /// Text following the `<name>` element, e.g. `[4]` or
    /// `[VK_UUID_SIZE]`.
    pub trailing: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum Command {
    /// Declares a second name for an existing command.
    Alias { name: String, alias: String },

    Definition(CommandDefinition),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct CommandDefinition {
    pub api: Option<String>,
    pub proto: NameWithType,
    pub params: Vec<CommandParam>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct CommandParam {
    pub api: Option<String>,
    pub definition: NameWithType,

    /// Canonical rendering of the declaration, e.g.
    /// `const VkInstanceCreateInfo * pCreateInfo`.
    pub code: String,

    /// Set when the text after `<name>` holds a `[...]` pair.
    pub is_array: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct NameWithType {
    pub type_name: Option<String>,
    pub name: String,
}

/// Feature level of the API.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct Feature {
    /// API names this feature belongs to, e.g. `vulkan,vulkansc`.
    pub api: Option<String>,

    /// Version macro, e.g. `VK_VERSION_1_0`.
    pub name: String,

    pub children: Vec<Require>,
}

/// A single extension.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct Extension {
    pub name: String,

    /// `disabled` marks extensions that are not published.
    pub supported: Option<String>,

    /// Dependency expression, e.g. `VK_KHR_surface+VK_VERSION_1_1`.
    pub depends: Option<String>,

    /// Name of a platform declared in `<platforms>`.
    pub platform: Option<String>,

    pub children: Vec<Require>,
}

/// A `<require>` block of a feature or extension.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct Require {
    pub depends: Option<String>,
    pub items: Vec<InterfaceItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum InterfaceItem {
    Type { name: String },
    Command { name: String },
}
