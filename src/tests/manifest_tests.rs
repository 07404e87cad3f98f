#[cfg(test)]
mod tests {
    use crate::decode_binary_xml;
    use crate::manifest::AndroidManifest;
    use crate::res::AttributeId;
    use crate::tests::fixtures::{AttrValue, XmlDocBuilder};

    const NAME: i32 = 0;
    const LABEL: i32 = 1;
    const VERSION_CODE: i32 = 2;
    const MIN_SDK: i32 = 3;
    const TARGET_SDK: i32 = 4;
    const EXPORTED: i32 = 5;
    const PRIORITY: i32 = 6;

    fn builder() -> XmlDocBuilder {
        XmlDocBuilder::new(&[
            (AttributeId::NAME.0, "name"),
            (AttributeId::LABEL.0, "label"),
            (AttributeId::VERSION_CODE.0, "versionCode"),
            (AttributeId::MIN_SDK_VERSION.0, "minSdkVersion"),
            (AttributeId::TARGET_SDK_VERSION.0, "targetSdkVersion"),
            (AttributeId::EXPORTED.0, "exported"),
            (AttributeId::PRIORITY.0, "priority"),
        ])
    }

    fn sample_manifest() -> Vec<u8> {
        let mut doc = builder();
        let package = doc.intern("com.example");
        let internet = doc.intern("android.permission.INTERNET");
        let camera = doc.intern("android.permission.CAMERA");
        let app_label = doc.intern("Example");
        let activity_name = doc.intern(".MainActivity");
        let service_name = doc.intern("com.other.Sync");
        let main_action = doc.intern("android.intent.action.MAIN");
        let launcher_category = doc.intern("android.intent.category.LAUNCHER");
        let package_attr = doc.intern("package");

        doc.start(
            "manifest",
            &[
                (package_attr, AttrValue::string(package)),
                (VERSION_CODE, AttrValue::int(42)),
            ],
        );
        doc.start(
            "uses-sdk",
            &[(MIN_SDK, AttrValue::int(21)), (TARGET_SDK, AttrValue::int(33))],
        );
        doc.end("uses-sdk");
        doc.start("uses-permission", &[(NAME, AttrValue::string(internet))]);
        doc.end("uses-permission");
        doc.start("uses-permission", &[(NAME, AttrValue::string(camera))]);
        doc.end("uses-permission");
        doc.start("application", &[(LABEL, AttrValue::string(app_label))]);
        doc.start(
            "activity",
            &[
                (NAME, AttrValue::string(activity_name)),
                (EXPORTED, AttrValue::boolean(true)),
            ],
        );
        doc.start("intent-filter", &[(PRIORITY, AttrValue::int(7))]);
        doc.start("action", &[(NAME, AttrValue::string(main_action))]);
        doc.end("action");
        doc.start("category", &[(NAME, AttrValue::string(launcher_category))]);
        doc.end("category");
        doc.end("intent-filter");
        doc.end("activity");
        doc.start("service", &[(NAME, AttrValue::string(service_name))]);
        doc.end("service");
        doc.end("application");
        doc.end("manifest");
        doc.build()
    }

    #[test]
    fn extracts_package_information() {
        let bytes = sample_manifest();
        let tree = decode_binary_xml(&bytes, None).unwrap();
        let manifest = AndroidManifest::parse(&tree).unwrap();

        assert_eq!(manifest.package_name, "com.example");
        assert_eq!(manifest.version_code, 42);
        assert_eq!(manifest.min_sdk_version, 21);
        assert_eq!(manifest.target_sdk_version, 33);
        // Absent attributes keep their sentinels.
        assert_eq!(manifest.max_sdk_version, -1);
        assert_eq!(manifest.version_name, "");
        assert_eq!(manifest.install_location, 0);
    }

    #[test]
    fn collects_permissions_in_document_order() {
        let bytes = sample_manifest();
        let tree = decode_binary_xml(&bytes, None).unwrap();
        let manifest = AndroidManifest::parse(&tree).unwrap();

        assert_eq!(
            manifest.uses_permissions,
            vec!["android.permission.INTERNET", "android.permission.CAMERA"]
        );
        assert!(manifest.permissions.is_empty());
    }

    #[test]
    fn builds_the_component_inventory() {
        let bytes = sample_manifest();
        let tree = decode_binary_xml(&bytes, None).unwrap();
        let manifest = AndroidManifest::parse(&tree).unwrap();
        let application = manifest.application.as_ref().unwrap();

        assert_eq!(application.label, "Example");
        assert_eq!(application.activities.len(), 1);
        assert_eq!(application.services.len(), 1);
        assert!(application.receivers.is_empty());
        assert!(application.providers.is_empty());

        let activity = &application.activities[0];
        // Shorthand names expand against the package.
        assert_eq!(activity.name, "com.example.MainActivity");
        assert!(activity.exported);
        assert!(activity.enabled);

        // Dotted names pass through untouched.
        assert_eq!(application.services[0].name, "com.other.Sync");
    }

    #[test]
    fn reads_intent_filters_and_finds_the_launcher() {
        let bytes = sample_manifest();
        let tree = decode_binary_xml(&bytes, None).unwrap();
        let manifest = AndroidManifest::parse(&tree).unwrap();
        let application = manifest.application.as_ref().unwrap();

        let activity = &application.activities[0];
        assert_eq!(activity.intent_filters.len(), 1);
        let filter = &activity.intent_filters[0];
        assert_eq!(filter.priority, 7);
        assert_eq!(filter.actions, vec!["android.intent.action.MAIN"]);
        assert_eq!(filter.categories, vec!["android.intent.category.LAUNCHER"]);

        let launcher = application.main_launcher().unwrap();
        assert_eq!(launcher.name, "com.example.MainActivity");
    }

    #[test]
    fn document_without_a_manifest_element_is_an_error() {
        let mut doc = builder();
        doc.start("resources", &[]);
        doc.end("resources");
        let bytes = doc.build();

        let tree = decode_binary_xml(&bytes, None).unwrap();
        assert!(AndroidManifest::parse(&tree).is_err());
    }
}
