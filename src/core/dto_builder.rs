use crate::core::version;
use crate::models::mod_dto::{RemoteMod, UnifiedMod, UnsafeLocalMod};

/// Merges a local record and a catalog record into the view the front-end shows.
/// Local data wins for identity and version; the catalog fills in the rest.
pub fn build_unified(
    local: Option<&UnsafeLocalMod>,
    remote: Option<&RemoteMod>,
) -> Option<UnifiedMod> {
    let valid = local.and_then(UnsafeLocalMod::as_valid);

    let (unique_name, name, author, description, version) = match (valid, local, remote) {
        (Some(m), _, _) => (
            m.unique_name.clone(),
            m.manifest.name.clone(),
            m.manifest.author.clone(),
            m.manifest
                .description
                .clone()
                .or_else(|| remote.map(|r| r.description.clone())),
            m.manifest.version.clone(),
        ),
        (None, _, Some(r)) => (
            r.unique_name.clone(),
            r.name.clone(),
            r.author.clone(),
            Some(r.description.clone()),
            r.version.clone(),
        ),
        (None, Some(UnsafeLocalMod::Invalid(failed)), None) => (
            failed.display_path.clone(),
            failed.display_path.clone(),
            String::new(),
            None,
            String::new(),
        ),
        _ => return None,
    };

    let outdated = match (valid, remote) {
        (Some(m), Some(r)) => version::is_outdated(&m.manifest.version, &r.version),
        _ => false,
    };

    Some(UnifiedMod {
        unique_name,
        name,
        slug: remote.map(|r| r.slug.clone()),
        author,
        description,
        version,
        outdated,
        enabled: local.is_some_and(UnsafeLocalMod::enabled),
        requires_dlc: remote.is_some_and(RemoteMod::requires_dlc),
        thumbnail_url: remote.and_then(|r| {
            r.thumbnail
                .open_graph
                .clone()
                .or_else(|| r.thumbnail.main.clone())
        }),
        downloads: remote.map_or(-1, |r| r.download_count),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::mod_dto::{FailedMod, LocalMod, ModError, ModManifest, ModThumbnail};

    fn local(version: &str, enabled: bool) -> UnsafeLocalMod {
        UnsafeLocalMod::Valid(LocalMod::new(
            "/mods/Foo",
            ModManifest {
                unique_name: "Author.Foo".into(),
                name: "Foo".into(),
                author: "Author".into(),
                version: version.into(),
                ..Default::default()
            },
            enabled,
        ))
    }

    fn remote(version: &str) -> RemoteMod {
        RemoteMod {
            unique_name: "Author.Foo".into(),
            name: "Foo (catalog)".into(),
            slug: "foo".into(),
            author: "Author".into(),
            description: "From the catalog".into(),
            version: version.into(),
            download_count: 42,
            tags: ["requires-dlc".to_string()].into_iter().collect(),
            thumbnail: ModThumbnail {
                main: Some("main.png".into()),
                open_graph: None,
            },
        }
    }

    #[test]
    fn test_local_only() {
        let view = build_unified(Some(&local("1.0.0", true)), None).unwrap();
        assert_eq!(view.name, "Foo");
        assert_eq!(view.version, "1.0.0");
        assert!(view.enabled);
        assert!(!view.outdated);
        assert_eq!(view.downloads, -1);
        assert_eq!(view.slug, None);
    }

    #[test]
    fn test_local_and_remote_outdated() {
        let view = build_unified(Some(&local("1.0.0", false)), Some(&remote("1.1.0"))).unwrap();
        assert_eq!(view.name, "Foo");
        assert_eq!(view.version, "1.0.0");
        assert!(view.outdated);
        assert!(view.requires_dlc);
        assert_eq!(view.description.as_deref(), Some("From the catalog"));
        assert_eq!(view.thumbnail_url.as_deref(), Some("main.png"));
        assert_eq!(view.downloads, 42);
    }

    #[test]
    fn test_remote_only() {
        let view = build_unified(None, Some(&remote("2.0.0"))).unwrap();
        assert_eq!(view.name, "Foo (catalog)");
        assert_eq!(view.version, "2.0.0");
        assert!(!view.enabled);
        assert!(!view.outdated);
    }

    #[test]
    fn test_invalid_local() {
        let failed = UnsafeLocalMod::Invalid(FailedMod {
            mod_path: "/mods/Broken".into(),
            display_path: "Broken".into(),
            error: ModError::invalid_manifest("expected value at line 1"),
        });
        let view = build_unified(Some(&failed), None).unwrap();
        assert_eq!(view.name, "Broken");
        assert!(!view.enabled);
    }

    #[test]
    fn test_nothing() {
        assert_eq!(build_unified(None, None), None);
    }
}
