//! Generation options.
//!
//! [`Config::default`] reproduces the built-in behavior. A TOML file only
//! needs to name the values it changes:
//!
//! ```toml
//! api = "vulkansc"
//! excluded_structs = []
//!
//! [layer]
//! export_macro = "MY_LAYER_EXPORT"
//! ```

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Commands whose interceptors the layer implements by hand.
pub const BOOTSTRAP_COMMANDS: &[&str] = &[
    "vkGetInstanceProcAddr",
    "vkGetDeviceProcAddr",
    "vkCreateInstance",
    "vkCreateDevice",
    "vkDestroyInstance",
    "vkDestroyDevice",
    "vkQueuePresentKHR",
];

/// Legacy Android structures that do not compile against current headers.
pub const LEGACY_ANDROID_STRUCTS: &[&str] = &[
    "VkNativeBufferUsage2ANDROID",
    "VkNativeBufferANDROID",
    "VkSwapchainImageCreateInfoANDROID",
    "VkPhysicalDevicePresentationPropertiesANDROID",
    "VkAndroidHardwareBufferFormatProperties2ANDROID",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// API name matched against `api` attributes, e.g. `vulkan`.
    pub api: String,

    /// Commands that get no generated wrapper, declaration or dispatch
    /// table entry.
    pub excluded_commands: Vec<String>,

    /// Structures that get no conversion function.
    pub excluded_structs: Vec<String>,

    pub layer: LayerConfig,
}

/// Names of the runtime hooks the generated code calls into.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayerConfig {
    /// Singleton owning the dispatch tables and the event sink.
    pub class: String,
    pub export_macro: String,
    pub assert_macro: String,
    pub event_type: String,

    /// Returned from `VkResult` wrappers when no dispatch table is bound.
    pub invalid_handle_result: String,

    pub command_header_includes: Vec<String>,
    pub command_source_includes: Vec<String>,
    pub struct_header_includes: Vec<String>,
    pub struct_source_includes: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api: String::from("vulkan"),
            excluded_commands: BOOTSTRAP_COMMANDS.iter().map(|s| s.to_string()).collect(),
            excluded_structs: LEGACY_ANDROID_STRUCTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            layer: LayerConfig::default(),
        }
    }
}

impl Default for LayerConfig {
    fn default() -> Self {
        fn strings(values: &[&str]) -> Vec<String> {
            values.iter().map(|s| s.to_string()).collect()
        }

        LayerConfig {
            class: String::from("VulkanMemoryInspector"),
            export_macro: String::from("VMI_EXPORT"),
            assert_macro: String::from("CCT_ASSERT_FALSE"),
            event_type: String::from("VulkanEvent"),
            invalid_handle_result: String::from("VK_ERROR_INVALID_EXTERNAL_HANDLE"),
            command_header_includes: strings(&[
                "<vulkan/vk_platform.h>",
                "<vulkan/vulkan.h>",
                "\"VMI/Defines.hpp\"",
            ]),
            command_source_includes: strings(&[
                "<cstring>",
                "<vulkan/vulkan.h>",
                "\"VMI/Defines.hpp\"",
                "\"VMI/VulkanMemoryInspector.hpp\"",
                "\"VMI/VulkanFunctions.hpp\"",
                "\"VMI/Bindings.hpp\"",
                "\"VMI/VulkanStructToJson.hpp\"",
            ]),
            struct_header_includes: strings(&["<vulkan/vulkan.h>", "<nlohmann/json.hpp>"]),
            struct_source_includes: strings(&[
                "<span>",
                "<string>",
                "\"VulkanStructToJson.hpp\"",
                "<nlohmann/json.hpp>",
            ]),
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Config, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Config::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Config, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn is_excluded_command(&self, name: &str) -> bool {
        self.excluded_commands.iter().any(|c| c == name)
    }

    pub fn is_excluded_struct(&self, name: &str) -> bool {
        self.excluded_structs.iter().any(|s| s == name)
    }

    /// Checks a comma separated `api` attribute. Elements without one apply
    /// to every API.
    pub fn accepts_api(&self, api: Option<&str>) -> bool {
        match api {
            Some(list) => list.split(',').any(|a| a.trim() == self.api),
            None => true,
        }
    }
}
