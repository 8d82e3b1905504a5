pub(super) fn default_alias_folder() -> String {
    "LATEST".to_string()
}

pub(super) fn default_pattern() -> String {
    "[organisation]/[module]/[revision]/[artifact]".to_string()
}

pub(super) fn default_temp_prefix() -> String {
    "revpubtemp".to_string()
}
