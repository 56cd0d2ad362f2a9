use crate::photos::{AssetVersion, RemotePhoto};
use crate::types::VersionSize;

/// Pick the requested size variants a photo actually offers, in request
/// order. Missing sizes are left out, never replaced by another size, and a
/// size requested twice is resolved once.
///
/// An empty result is routine (videos and some shared items carry no
/// medium/thumb renditions) and callers treat it as "nothing to fetch".
pub fn resolve_variants<'a>(
    photo: &'a RemotePhoto,
    sizes: &[VersionSize],
) -> Vec<(VersionSize, &'a AssetVersion)> {
    let mut resolved: Vec<(VersionSize, &AssetVersion)> = Vec::with_capacity(sizes.len());
    for size in sizes {
        if resolved.iter().any(|(s, _)| s == size) {
            continue;
        }
        match photo.versions().get(size) {
            Some(version) => resolved.push((*size, version)),
            None => tracing::debug!(
                "Size {} not offered for {}, skipping",
                size,
                photo.filename()
            ),
        }
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::photos::memory::photo;

    #[test]
    fn test_resolves_in_request_order() {
        let p = photo(
            "IMG_1.JPG",
            &[
                (VersionSize::Original, "orig"),
                (VersionSize::Thumb, "t"),
                (VersionSize::Medium, "med"),
            ],
        );
        let got: Vec<VersionSize> = resolve_variants(&p, &[VersionSize::Thumb, VersionSize::Original])
            .into_iter()
            .map(|(s, _)| s)
            .collect();
        assert_eq!(got, vec![VersionSize::Thumb, VersionSize::Original]);
    }

    #[test]
    fn test_missing_sizes_not_substituted() {
        let p = photo("IMG_1.JPG", &[(VersionSize::Original, "orig")]);
        assert!(resolve_variants(&p, &[VersionSize::Medium, VersionSize::Thumb]).is_empty());
    }

    #[test]
    fn test_partial_resolution() {
        let p = photo("IMG_1.JPG", &[(VersionSize::Original, "orig")]);
        let got = resolve_variants(&p, &[VersionSize::Medium, VersionSize::Original]);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].0, VersionSize::Original);
        assert_eq!(got[0].1.size, Some(4));
    }

    #[test]
    fn test_duplicate_request_resolved_once() {
        let p = photo("IMG_1.JPG", &[(VersionSize::Original, "orig")]);
        let got = resolve_variants(&p, &[VersionSize::Original, VersionSize::Original]);
        assert_eq!(got.len(), 1);
    }

    #[test]
    fn test_empty_request() {
        let p = photo("IMG_1.JPG", &[(VersionSize::Original, "orig")]);
        assert!(resolve_variants(&p, &[]).is_empty());
    }
}
