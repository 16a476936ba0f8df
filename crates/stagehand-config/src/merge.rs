//! Layered configuration merging.

/// Recursively deep-merge `overlay` into `base`.
///
/// - Tables merge recursively per-field.
/// - Scalars and arrays from the overlay **replace** the base value.
pub fn deep_merge(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                if let Some(base_val) = base_table.get_mut(key) {
                    deep_merge(base_val, overlay_val);
                } else {
                    base_table.insert(key.clone(), overlay_val.clone());
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
        },
    }
}

/// Set a dotted `path` (e.g. `"timing.text_char_delay_ms"`) in `root`,
/// creating intermediate tables as needed.
pub fn set_path(root: &mut toml::Value, path: &str, value: toml::Value) {
    let mut segments = path.split('.').peekable();
    let mut node = root;
    while let Some(segment) = segments.next() {
        let toml::Value::Table(table) = node else {
            return;
        };
        if segments.peek().is_none() {
            table.insert(segment.to_owned(), value);
            return;
        }
        node = table
            .entry(segment.to_owned())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> toml::Value {
        toml::from_str(s).unwrap()
    }

    #[test]
    fn test_tables_merge_per_field() {
        let mut base = parse(
            r#"
            [timing]
            text_char_delay_ms = 30
            slide_char_delay_ms = 20
        "#,
        );
        let overlay = parse(
            r#"
            [timing]
            text_char_delay_ms = 5
        "#,
        );
        deep_merge(&mut base, &overlay);
        assert_eq!(base["timing"]["text_char_delay_ms"].as_integer(), Some(5));
        assert_eq!(base["timing"]["slide_char_delay_ms"].as_integer(), Some(20));
    }

    #[test]
    fn test_arrays_replace() {
        let mut base = parse(r#"logging = { directives = ["a=debug", "b=warn"] }"#);
        let overlay = parse(r#"logging = { directives = ["c=trace"] }"#);
        deep_merge(&mut base, &overlay);
        let directives = base["logging"]["directives"].as_array().unwrap();
        assert_eq!(directives.len(), 1);
    }

    #[test]
    fn test_set_path_creates_tables() {
        let mut root = toml::Value::Table(toml::map::Map::new());
        set_path(&mut root, "logging.level", toml::Value::String("debug".to_owned()));
        assert_eq!(root["logging"]["level"].as_str(), Some("debug"));
    }
}
