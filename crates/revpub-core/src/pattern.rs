use revpub_types::ModuleRevisionId;

/// Expand a publish pattern such as
/// `[organisation]/[module]/[revision]/[artifact]` for one artifact file.
pub fn expand_pattern(pattern: &str, mrid: &ModuleRevisionId, artifact: &str) -> String {
    pattern
        .replace("[organisation]", &mrid.organisation)
        .replace("[organization]", &mrid.organisation)
        .replace("[module]", &mrid.name)
        .replace("[revision]", &mrid.revision)
        .replace("[artifact]", artifact)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_all_tokens() {
        let mrid = ModuleRevisionId::new("org.acme", "widget", "1.0");
        assert_eq!(
            expand_pattern("[organisation]/[module]/[revision]/[artifact]", &mrid, "widget.jar"),
            "org.acme/widget/1.0/widget.jar"
        );
        assert_eq!(
            expand_pattern("[organization]/[module]-[revision]/[artifact]", &mrid, "a.pom"),
            "org.acme/widget-1.0/a.pom"
        );
    }
}
