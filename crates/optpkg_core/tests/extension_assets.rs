use optpkg_core::{
    CapabilityError, CapabilityRegistry, InstallProgressEvent, ManifestPackageSource,
    RegistryConfig, FACE_FILTERS_CAPABILITY,
};
use std::path::Path;
use std::sync::Arc;

fn write_filters_package(root: &Path) {
    let content = root.join("filters").join("Content");
    std::fs::create_dir_all(&content).unwrap();
    std::fs::write(content.join("sunglasses.png"), b"png").unwrap();
    std::fs::write(content.join("hat.png"), b"png").unwrap();
    std::fs::create_dir_all(content.join("thumbnails")).unwrap();
}

fn write_manifest(root: &Path, installed: bool) -> std::path::PathBuf {
    let path = root.join("packages.json");
    std::fs::write(
        &path,
        format!(
            r#"{{
                "dependencies": [
                    {{
                        "family_name": "FabrikamFaceFilters_8wekyb3d8bbwe",
                        "is_optional": true,
                        "installed": {installed},
                        "installed_location": "filters"
                    }}
                ]
            }}"#
        ),
    )
    .unwrap();
    path
}

fn registry_for(manifest: &Path) -> CapabilityRegistry {
    let config = RegistryConfig::builtin();
    CapabilityRegistry::from_config(
        &config,
        Arc::new(ManifestPackageSource::new(manifest)),
        Arc::new(config.native_loader()),
    )
    .expect("builtin config is valid")
}

#[test]
fn resolves_and_lists_assets_of_installed_package() {
    let dir = tempfile::tempdir().unwrap();
    write_filters_package(dir.path());
    let registry = registry_for(&write_manifest(dir.path(), true));
    registry.refresh();

    let path = registry
        .asset_path(FACE_FILTERS_CAPABILITY, "hat.png")
        .expect("hat asset should resolve");
    assert_eq!(path, dir.path().join("filters/Content/hat.png"));

    let names = registry.list_assets(FACE_FILTERS_CAPABILITY).unwrap();
    assert_eq!(names, vec!["hat.png".to_string(), "sunglasses.png".to_string()]);
}

#[test]
fn rejects_escaping_or_missing_assets() {
    let dir = tempfile::tempdir().unwrap();
    write_filters_package(dir.path());
    let registry = registry_for(&write_manifest(dir.path(), true));
    registry.refresh();

    for name in ["../packages.json", "thumbnails/a.png", "/etc/hosts", "  "] {
        assert!(matches!(
            registry.asset_path(FACE_FILTERS_CAPABILITY, name),
            Err(CapabilityError::InvalidAssetName(_))
        ));
    }
    assert_eq!(
        registry
            .asset_path(FACE_FILTERS_CAPABILITY, "crown.png")
            .unwrap_err(),
        CapabilityError::AssetMissing {
            capability_id: FACE_FILTERS_CAPABILITY.to_string(),
            asset: "crown.png".to_string(),
        }
    );
    assert!(matches!(
        registry.asset_path(FACE_FILTERS_CAPABILITY, "thumbnails"),
        Err(CapabilityError::AssetMissing { .. })
    ));
}

#[test]
fn assets_require_installed_capability_and_location() {
    let dir = tempfile::tempdir().unwrap();
    write_filters_package(dir.path());
    let manifest = write_manifest(dir.path(), false);
    let registry = registry_for(&manifest);
    registry.refresh();

    assert_eq!(
        registry
            .asset_path(FACE_FILTERS_CAPABILITY, "hat.png")
            .unwrap_err(),
        CapabilityError::NotInstalled(FACE_FILTERS_CAPABILITY.to_string())
    );

    // Installed through a notification that carries no location.
    registry.on_install_progress(&InstallProgressEvent::completed(
        "FabrikamFaceFilters_8wekyb3d8bbwe",
    ));
    assert!(matches!(
        registry.list_assets(FACE_FILTERS_CAPABILITY),
        Err(CapabilityError::AssetMissing { .. })
    ));

    // The next enumeration backfills the location once the manifest has one.
    write_manifest(dir.path(), true);
    assert!(registry.refresh().is_empty());
    assert!(registry
        .asset_path(FACE_FILTERS_CAPABILITY, "sunglasses.png")
        .is_ok());
}
