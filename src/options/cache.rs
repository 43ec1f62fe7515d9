//! Cache import/export specs

use super::{parse_flat_assignments, parse_option_record, OptionEntry, OptionSpec};
use crate::error::{BuildError, BuildResult};
use tracing::warn;

/// Cache entries share the generic record layout
pub type CacheOptionEntry = OptionEntry;

/// Kind substituted for legacy bare-reference specs
const LEGACY_CACHE_KIND: &str = "registry";

/// Export mode used when none is given
const DEFAULT_EXPORT_MODE: &str = "min";

fn with_default_mode(mut entry: CacheOptionEntry) -> CacheOptionEntry {
    entry
        .attrs
        .entry("mode".to_string())
        .or_insert_with(|| DEFAULT_EXPORT_MODE.to_string());
    entry
}

/// Parse `--export-cache` values together with the deprecated
/// `--export-cache-opt` list.
pub fn parse_export_cache(
    export_caches: &[String],
    legacy_opts: &[String],
) -> BuildResult<Vec<CacheOptionEntry>> {
    if !legacy_opts.is_empty() && export_caches.len() != 1 {
        return Err(BuildError::OptionConflict(
            "--export-cache-opt requires exactly single --export-cache".to_string(),
        ));
    }

    let mut exports = Vec::with_capacity(export_caches.len());
    for spec in export_caches {
        let entry = match OptionSpec::classify(spec) {
            OptionSpec::Legacy(reference) => {
                warn!(
                    "--export-cache <ref> --export-cache-opt <opt>=<optval> is deprecated. \
                     Please use --export-cache type=registry,ref=<ref>,<opt>=<optval>[,<opt>=<optval>] instead."
                );
                let mut entry = CacheOptionEntry::new(LEGACY_CACHE_KIND);
                entry.attrs = parse_flat_assignments(legacy_opts)?;
                entry.attrs.insert("ref".to_string(), reference.to_string());
                entry
            }
            OptionSpec::Structured(spec) => {
                if !legacy_opts.is_empty() {
                    return Err(BuildError::OptionConflict(
                        "--export-cache-opt is not supported for the specified --export-cache. \
                         Please use --export-cache type=<type>,<opt>=<optval>[,<opt>=<optval>] instead."
                            .to_string(),
                    ));
                }
                parse_option_record(spec, "--export-cache")?
            }
        };
        exports.push(with_default_mode(entry));
    }

    Ok(exports)
}

/// Parse `--import-cache` values
pub fn parse_import_cache(import_caches: &[String]) -> BuildResult<Vec<CacheOptionEntry>> {
    import_caches
        .iter()
        .map(|spec| match OptionSpec::classify(spec) {
            OptionSpec::Legacy(reference) => {
                warn!(
                    "--import-cache <ref> is deprecated. \
                     Please use --import-cache type=registry,ref=<ref>,<opt>=<optval>[,<opt>=<optval>] instead."
                );
                let mut entry = CacheOptionEntry::new(LEGACY_CACHE_KIND);
                entry.attrs.insert("ref".to_string(), reference.to_string());
                Ok(entry)
            }
            OptionSpec::Structured(spec) => parse_option_record(spec, "--import-cache"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn export_defaults_mode_to_min() {
        let exports =
            parse_export_cache(&strings(&["type=local,dest=/tmp/cache"]), &[]).unwrap();
        assert_eq!(exports[0].attr("mode"), Some("min"));
    }

    #[test]
    fn export_keeps_explicit_mode() {
        let exports =
            parse_export_cache(&strings(&["type=registry,ref=foo,mode=max"]), &[]).unwrap();
        assert_eq!(exports[0].attr("mode"), Some("max"));
    }

    #[test]
    fn export_requires_type() {
        let err = parse_export_cache(&strings(&["type=,ref=foo"]), &[]).unwrap_err();
        assert_eq!(err.to_string(), "--export-cache requires type=<type>");
    }

    #[test]
    fn legacy_export_merges_companion_options() {
        let exports = parse_export_cache(
            &strings(&["example.com/foo/bar:cache"]),
            &strings(&["mode=max", "compression=zstd"]),
        )
        .unwrap();
        let entry = &exports[0];
        assert_eq!(entry.kind, "registry");
        assert_eq!(entry.attr("ref"), Some("example.com/foo/bar:cache"));
        assert_eq!(entry.attr("mode"), Some("max"));
        assert_eq!(entry.attr("compression"), Some("zstd"));
    }

    #[test]
    fn legacy_export_preserves_reference_exactly() {
        let reference = "registry:5000/a/b@sha256:abc";
        let exports = parse_export_cache(&strings(&[reference]), &[]).unwrap();
        assert_eq!(exports[0].attr("ref"), Some(reference));
        assert_eq!(exports[0].attr("mode"), Some("min"));
    }

    #[test]
    fn companion_options_need_exactly_one_export() {
        let err = parse_export_cache(&strings(&["a", "b"]), &strings(&["mode=max"])).unwrap_err();
        assert!(err.to_string().contains("exactly single --export-cache"));

        let err = parse_export_cache(&[], &strings(&["mode=max"])).unwrap_err();
        assert!(matches!(err, BuildError::OptionConflict(_)));
    }

    #[test]
    fn companion_options_rejected_with_structured_spec() {
        let err = parse_export_cache(
            &strings(&["type=registry,ref=foo"]),
            &strings(&["mode=max"]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("--export-cache-opt is not supported"));
    }

    #[test]
    fn malformed_companion_option_fails() {
        let err = parse_export_cache(&strings(&["foo"]), &strings(&["nope"])).unwrap_err();
        assert_eq!(err.to_string(), "invalid value nope");
    }

    #[test]
    fn import_structured_and_legacy() {
        let imports =
            parse_import_cache(&strings(&["type=local,src=/tmp/cache", "example.com/cache"]))
                .unwrap();
        assert_eq!(imports[0].kind, "local");
        assert_eq!(imports[0].attr("src"), Some("/tmp/cache"));
        assert_eq!(imports[0].attr("mode"), None);
        assert_eq!(imports[1].kind, "registry");
        assert_eq!(imports[1].attr("ref"), Some("example.com/cache"));
    }

    #[test]
    fn import_requires_type() {
        let err = parse_import_cache(&strings(&["type=,src=x"])).unwrap_err();
        assert_eq!(err.to_string(), "--import-cache requires type=<type>");
    }
}
