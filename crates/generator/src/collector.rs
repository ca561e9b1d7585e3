//! Groups services by proto package across input files

use carno_codegen_common::{GeneratorError, GroupedService, PackageGroup, ProtoFile};
use std::collections::HashMap;

/// A file rejected while grouping
#[derive(Debug)]
pub struct RejectedFile {
    pub file: String,
    pub error: GeneratorError,
}

/// Result of grouping: packages in first-seen order plus rejected files
#[derive(Debug, Default)]
pub struct Collection {
    pub groups: Vec<PackageGroup>,
    pub rejected: Vec<RejectedFile>,
}

/// Builds package groups from the ordered set of input files
pub struct DescriptorCollector;

impl DescriptorCollector {
    /// Group every service by package
    ///
    /// Packages keep first-seen order; services keep file-processing order,
    /// then declaration order. Files without services are skipped. A file
    /// with services but no package is rejected and contributes nothing.
    pub fn collect<'a, I>(files: I) -> Collection
    where
        I: IntoIterator<Item = &'a ProtoFile>,
    {
        let mut collection = Collection::default();
        let mut index: HashMap<String, usize> = HashMap::new();

        for file in files {
            if file.services.is_empty() {
                continue;
            }

            if file.package.is_empty() {
                tracing::warn!(file = %file.name, "file declares services without a package");
                collection.rejected.push(RejectedFile {
                    file: file.name.clone(),
                    error: GeneratorError::Configuration(format!(
                        "{} declares services but no package",
                        file.name
                    )),
                });
                continue;
            }

            let slot = *index.entry(file.package.clone()).or_insert_with(|| {
                collection.groups.push(PackageGroup {
                    package: file.package.clone(),
                    services: Vec::new(),
                });
                collection.groups.len() - 1
            });

            collection.groups[slot]
                .services
                .extend(file.services.iter().map(|service| GroupedService {
                    file: file.name.clone(),
                    go_package: file.go_package.clone(),
                    service: service.clone(),
                }));
        }

        collection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carno_codegen_common::{GoPackage, ServiceDescriptor};

    fn proto(name: &str, package: &str, services: &[&str]) -> ProtoFile {
        ProtoFile {
            name: name.to_string(),
            package: package.to_string(),
            go_package: GoPackage {
                import_path: format!("example.com/{}", package),
                name: package.to_string(),
            },
            services: services
                .iter()
                .map(|s| ServiceDescriptor {
                    name: s.to_string(),
                    methods: vec![],
                    comments: vec![],
                })
                .collect(),
            go_types: vec![],
        }
    }

    fn service_names(group: &PackageGroup) -> Vec<&str> {
        group
            .services
            .iter()
            .map(|s| s.service.name.as_str())
            .collect()
    }

    #[test]
    fn test_groups_preserve_first_seen_order() {
        let files = vec![
            proto("b.proto", "beta", &["B1"]),
            proto("a1.proto", "alpha", &["A1", "A2"]),
            proto("b2.proto", "beta", &["B2"]),
            proto("a2.proto", "alpha", &["A3"]),
        ];

        let collection = DescriptorCollector::collect(&files);
        let packages: Vec<&str> = collection
            .groups
            .iter()
            .map(|g| g.package.as_str())
            .collect();
        assert_eq!(packages, vec!["beta", "alpha"]);

        assert_eq!(
            service_names(&collection.groups[1]),
            vec!["A1", "A2", "A3"]
        );
        assert_eq!(
            service_names(&collection.groups[0]),
            vec!["B1", "B2"]
        );
        assert!(collection.rejected.is_empty());
    }

    #[test]
    fn test_empty_package_rejected() {
        let files = vec![
            proto("ok.proto", "demo", &["Echo"]),
            proto("bad.proto", "", &["Orphan"]),
        ];

        let collection = DescriptorCollector::collect(&files);
        assert_eq!(collection.groups.len(), 1);
        assert_eq!(collection.rejected.len(), 1);
        assert_eq!(collection.rejected[0].file, "bad.proto");
        assert!(matches!(
            collection.rejected[0].error,
            GeneratorError::Configuration(_)
        ));
    }

    #[test]
    fn test_files_without_services_pass_through() {
        let files = vec![proto("types.proto", "", &[]), proto("types2.proto", "x", &[])];

        let collection = DescriptorCollector::collect(&files);
        assert!(collection.groups.is_empty());
        assert!(collection.rejected.is_empty());
    }
}
