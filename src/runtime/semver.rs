use semver::Version;

/// Parse a Node.js version string into a semver::Version.
///
/// Accepts the `v` prefix used by the release index and by install directory
/// names. Partial versions are rejected; use requirements for those.
///
/// Examples:
/// - "v18.0.0" -> Version(18, 0, 0)
/// - "20.11.1" -> Version(20, 11, 1)
/// - "v22.0.0-rc.1" -> Version(22, 0, 0, pre: rc.1)
pub fn parse_version(version: &str) -> Option<Version> {
    let version = version.trim();
    let stripped = version.strip_prefix('v').unwrap_or(version);
    Version::parse(stripped).ok()
}

/// Pick the item with the highest version.
///
/// Ordering is full semver precedence; a prerelease sorts below its release.
/// Equal versions keep the first item seen.
pub fn find_highest<T, F>(items: impl IntoIterator<Item = T>, version_of: F) -> Option<T>
where
    F: Fn(&T) -> &Version,
{
    items.into_iter().fold(None, |best, item| match best {
        Some(current) if version_of(&current) >= version_of(&item) => Some(current),
        _ => Some(item),
    })
}
