//! Typed view over a decoded binary `AndroidManifest.xml`.
//!
//! The manifest is the primary consumer of the binary XML decoder: element
//! names come from the document string pool, attribute values are rendered
//! through the resource table when one is available, and nesting is
//! recovered with [`XmlChunk::chunks_within`]. Attribute misses never fail;
//! they produce empty strings or the documented Android default.

use log::warn;

use crate::res::{AttributeId, Chunk, DecodeError, DecodeResult, XmlStartElementChunk, XmlTree};

use serde::Serialize;

const MANIFEST_ELEMENT: &str = "manifest";
const APPLICATION_ELEMENT: &str = "application";
const USES_PERMISSION: &str = "uses-permission";
const PERMISSION: &str = "permission";
const USES_FEATURE: &str = "uses-feature";
const SUPPORTS_GL_TEXTURE: &str = "supports-gl-texture";
const USES_SDK: &str = "uses-sdk";

const ACTIVITY: &str = "activity";
const SERVICE: &str = "service";
const RECEIVER: &str = "receiver";
const PROVIDER: &str = "provider";

const INTENT_FILTER: &str = "intent-filter";
const ACTION: &str = "action";
const CATEGORY: &str = "category";

/// The package-level facts and component inventory of an application.
#[derive(Debug, Default, Serialize)]
pub struct AndroidManifest {
    pub package_name: String,
    pub version_code: i32,
    pub version_name: String,
    pub shared_user_id: String,
    pub shared_user_label: String,
    pub install_location: i32,
    pub platform_build_version_code: i32,
    pub platform_build_version_name: String,
    pub min_sdk_version: i32,
    pub target_sdk_version: i32,
    pub max_sdk_version: i32,
    pub uses_permissions: Vec<String>,
    pub permissions: Vec<String>,
    pub uses_features: Vec<String>,
    pub supports_gl_textures: Vec<String>,
    pub application: Option<Application>,
}

/// The `<application>` element and the four component inventories under it.
#[derive(Debug, Default, Serialize)]
pub struct Application {
    pub name: String,
    pub label: String,
    pub icon: String,
    pub theme: String,
    pub process: String,
    pub permission: String,
    pub debuggable: bool,
    pub allow_backup: bool,
    pub enabled: bool,
    pub activities: Vec<Component>,
    pub services: Vec<Component>,
    pub receivers: Vec<Component>,
    pub providers: Vec<Component>,
}

/// An activity, service, receiver or provider declaration.
#[derive(Debug, Default, Serialize)]
pub struct Component {
    /// Full component name, including the package name.
    pub name: String,
    pub label: String,
    pub icon: String,
    pub permission: String,
    pub process: String,
    pub enabled: bool,
    pub exported: bool,
    pub direct_boot_aware: bool,
    pub intent_filters: Vec<IntentFilter>,
}

#[derive(Debug, Default, Serialize)]
pub struct IntentFilter {
    pub actions: Vec<String>,
    pub categories: Vec<String>,
    pub priority: i32,
}

impl AndroidManifest {
    /// Builds the manifest model from a decoded document. The first
    /// `<manifest>` element wins; later ones are ignored with a warning.
    pub fn parse(tree: &XmlTree<'_>) -> DecodeResult<AndroidManifest> {
        let document = tree.document();
        let mut root = None;
        for element in document.start_elements() {
            if document.element_name(element) == MANIFEST_ELEMENT {
                if root.is_some() {
                    warn!("Multiple manifest elements found; ignoring");
                    continue;
                }
                root = Some(element);
            }
        }
        let root = root.ok_or_else(|| {
            DecodeError::Malformed("document has no manifest element".to_string())
        })?;

        let mut manifest = AndroidManifest {
            package_name: tree.attribute_named(root, "package"),
            version_code: tree.attribute_int(root, AttributeId::VERSION_CODE, -1),
            version_name: tree.attribute(root, AttributeId::VERSION_NAME),
            shared_user_id: tree.attribute(root, AttributeId::SHARED_USER_ID),
            shared_user_label: tree.attribute(root, AttributeId::SHARED_USER_LABEL),
            install_location: tree.attribute_int(root, AttributeId::INSTALL_LOCATION, 0),
            platform_build_version_code: parse_raw_int(
                &tree.attribute_named(root, "platformBuildVersionCode"),
                -1,
            ),
            platform_build_version_name: tree.attribute_named(root, "platformBuildVersionName"),
            min_sdk_version: -1,
            target_sdk_version: -1,
            max_sdk_version: -1,
            ..AndroidManifest::default()
        };

        for chunk in document.chunks_within(root) {
            let Chunk::XmlStartElement(element) = chunk else {
                continue;
            };
            match document.element_name(element) {
                APPLICATION_ELEMENT => {
                    manifest.application =
                        Some(Application::parse(tree, element, &manifest.package_name));
                }
                USES_PERMISSION => {
                    manifest
                        .uses_permissions
                        .push(tree.attribute(element, AttributeId::NAME));
                }
                PERMISSION => {
                    manifest
                        .permissions
                        .push(tree.attribute(element, AttributeId::NAME));
                }
                USES_FEATURE => {
                    manifest
                        .uses_features
                        .push(tree.attribute(element, AttributeId::NAME));
                }
                SUPPORTS_GL_TEXTURE => {
                    manifest
                        .supports_gl_textures
                        .push(tree.attribute(element, AttributeId::NAME));
                }
                USES_SDK => {
                    manifest.min_sdk_version =
                        tree.attribute_int(element, AttributeId::MIN_SDK_VERSION, -1);
                    manifest.target_sdk_version =
                        tree.attribute_int(element, AttributeId::TARGET_SDK_VERSION, -1);
                    manifest.max_sdk_version =
                        tree.attribute_int(element, AttributeId::MAX_SDK_VERSION, -1);
                }
                _ => {}
            }
        }

        Ok(manifest)
    }
}

impl Application {
    fn parse(tree: &XmlTree<'_>, element: &XmlStartElementChunk, package_name: &str) -> Application {
        let document = tree.document();
        let mut application = Application {
            name: full_component_name(&tree.attribute(element, AttributeId::NAME), package_name),
            label: tree.attribute(element, AttributeId::LABEL),
            icon: tree.attribute(element, AttributeId::ICON),
            theme: tree.attribute(element, AttributeId::THEME),
            process: tree.attribute(element, AttributeId::PROCESS),
            permission: tree.attribute(element, AttributeId::PERMISSION),
            debuggable: tree.attribute_bool(element, AttributeId::DEBUGGABLE, false),
            allow_backup: tree.attribute_bool(element, AttributeId::ALLOW_BACKUP, true),
            enabled: tree.attribute_bool(element, AttributeId::ENABLED, true),
            ..Application::default()
        };

        for chunk in document.chunks_within(element) {
            let Chunk::XmlStartElement(child) = chunk else {
                continue;
            };
            match document.element_name(child) {
                ACTIVITY => {
                    application
                        .activities
                        .push(Component::parse(tree, child, package_name));
                }
                SERVICE => {
                    application
                        .services
                        .push(Component::parse(tree, child, package_name));
                }
                RECEIVER => {
                    application
                        .receivers
                        .push(Component::parse(tree, child, package_name));
                }
                PROVIDER => {
                    application
                        .providers
                        .push(Component::parse(tree, child, package_name));
                }
                _ => {}
            }
        }

        application
    }

    /// The activity holding both the MAIN action and the LAUNCHER category,
    /// if any.
    pub fn main_launcher(&self) -> Option<&Component> {
        self.activities.iter().find(|activity| {
            let mut has_main = false;
            let mut has_launcher = false;
            for filter in &activity.intent_filters {
                has_main |= filter.actions.iter().any(|a| a == "android.intent.action.MAIN");
                has_launcher |= filter
                    .categories
                    .iter()
                    .any(|c| c == "android.intent.category.LAUNCHER");
            }
            has_main && has_launcher
        })
    }
}

impl Component {
    fn parse(tree: &XmlTree<'_>, element: &XmlStartElementChunk, package_name: &str) -> Component {
        let document = tree.document();
        let mut component = Component {
            name: full_component_name(&tree.attribute(element, AttributeId::NAME), package_name),
            label: tree.attribute(element, AttributeId::LABEL),
            icon: tree.attribute(element, AttributeId::ICON),
            permission: tree.attribute(element, AttributeId::PERMISSION),
            process: tree.attribute(element, AttributeId::PROCESS),
            enabled: tree.attribute_bool(element, AttributeId::ENABLED, true),
            exported: tree.attribute_bool(element, AttributeId::EXPORTED, false),
            direct_boot_aware: tree.attribute_bool(element, AttributeId::DIRECT_BOOT_AWARE, false),
            intent_filters: Vec::new(),
        };

        for chunk in document.chunks_within(element) {
            let Chunk::XmlStartElement(child) = chunk else {
                continue;
            };
            if document.element_name(child) == INTENT_FILTER {
                component
                    .intent_filters
                    .push(IntentFilter::parse(tree, child));
            }
        }

        component
    }
}

impl IntentFilter {
    fn parse(tree: &XmlTree<'_>, element: &XmlStartElementChunk) -> IntentFilter {
        let document = tree.document();
        let mut filter = IntentFilter {
            priority: tree.attribute_int(element, AttributeId::PRIORITY, 0),
            ..IntentFilter::default()
        };

        for chunk in document.chunks_within(element) {
            let Chunk::XmlStartElement(child) = chunk else {
                continue;
            };
            match document.element_name(child) {
                ACTION => filter.actions.push(tree.attribute(child, AttributeId::NAME)),
                CATEGORY => filter
                    .categories
                    .push(tree.attribute(child, AttributeId::NAME)),
                _ => {}
            }
        }

        filter
    }
}

/// Expands shorthand component names against the package: `.Main` and
/// `Main` both become `com.example.Main`, dotted names pass through.
fn full_component_name(component_name: &str, package_name: &str) -> String {
    if component_name.is_empty() {
        String::new()
    } else if component_name.starts_with('.') {
        format!("{package_name}{component_name}")
    } else if !component_name.contains('.') {
        format!("{package_name}.{component_name}")
    } else {
        component_name.to_string()
    }
}

fn parse_raw_int(value: &str, default: i32) -> i32 {
    if value.is_empty() {
        return default;
    }
    match value.parse() {
        Ok(parsed) => parsed,
        Err(_) => {
            warn!("{value:?} is not an integer");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::full_component_name;

    #[test]
    fn component_names_expand_against_the_package() {
        assert_eq!(full_component_name("", "com.example"), "");
        assert_eq!(full_component_name(".Main", "com.example"), "com.example.Main");
        assert_eq!(full_component_name("Main", "com.example"), "com.example.Main");
        assert_eq!(
            full_component_name("org.other.Main", "com.example"),
            "org.other.Main"
        );
    }
}
