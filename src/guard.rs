//! Preprocessor guards for generated code.

use crate::model::{CommandInfo, Model};

/// Joins the non-empty fragments with ` && `.
pub fn render(fragments: &[String]) -> String {
    fragments
        .iter()
        .filter(|f| !f.is_empty())
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(" && ")
}

/// A feature or extension together with the commands it claimed.
#[derive(Debug, Clone)]
pub struct Scope<'a> {
    pub guard: Vec<String>,
    pub commands: Vec<&'a CommandInfo>,
}

impl<'a> Scope<'a> {
    /// The `#if` condition, present only when both the guard and the command
    /// list are non-empty.
    pub fn condition(&self) -> Option<String> {
        let condition = render(&self.guard);
        if condition.is_empty() || self.commands.is_empty() {
            None
        } else {
            Some(condition)
        }
    }

    pub fn retain<F: FnMut(&CommandInfo) -> bool>(mut self, mut f: F) -> Scope<'a> {
        self.commands.retain(|c| f(c));
        self
    }
}

pub fn feature_guard(feature: &str) -> Vec<String> {
    vec![feature.to_owned()]
}

pub fn extension_guard(model: &Model, extension: &str) -> Vec<String> {
    let mut guard = vec![format!("defined({})", extension)];
    if let Some(info) = model.extensions.get(extension) {
        if let Some(depends) = &info.depends {
            guard.push(depends.to_string());
        }
        if let Some(platform) = &info.platform {
            guard.push(platform.clone());
        }
    }
    guard
}

/// Feature guard used inside the proc-address functions. Features named
/// after a platform also require its protection macro.
pub fn proc_addr_feature_guard(model: &Model, feature: &str) -> Vec<String> {
    let mut guard = feature_guard(feature);
    if let Some(protect) = model.platforms.get(feature) {
        guard.push(protect.clone());
    }
    guard
}

/// Feature scopes followed by extension scopes, in declaration order.
pub fn command_scopes(model: &Model) -> (Vec<Scope<'_>>, Vec<Scope<'_>>) {
    let features = model
        .features
        .keys()
        .map(|feature| Scope {
            guard: feature_guard(feature),
            commands: model.feature_commands(feature).collect(),
        })
        .collect();
    (features, extension_scopes(model))
}

/// Like [`command_scopes`], with the platform rule of
/// [`proc_addr_feature_guard`] applied to features.
pub fn proc_addr_scopes(model: &Model) -> Vec<Scope<'_>> {
    let mut scopes: Vec<Scope> = model
        .features
        .keys()
        .map(|feature| Scope {
            guard: proc_addr_feature_guard(model, feature),
            commands: model.feature_commands(feature).collect(),
        })
        .collect();
    scopes.extend(extension_scopes(model));
    scopes
}

fn extension_scopes(model: &Model) -> Vec<Scope<'_>> {
    model
        .extensions
        .keys()
        .map(|extension| Scope {
            guard: extension_guard(model, extension),
            commands: model.extension_commands(extension).collect(),
        })
        .collect()
}

/// Conjunction of every feature and extension guard of a struct, shared by
/// its declaration and its definition. `None` when nothing requires it.
pub fn struct_guard(model: &Model, name: &str) -> Option<String> {
    let mut fragments = Vec::new();
    if let Some(guards) = model.struct_feature_guards.get(name) {
        fragments.extend(guards.iter().cloned());
    }
    if let Some(guards) = model.struct_extension_guards.get(name) {
        fragments.extend(guards.iter().flat_map(|g| g.fragments()));
    }
    let guard = render(&fragments);
    if guard.is_empty() {
        None
    } else {
        Some(guard)
    }
}
