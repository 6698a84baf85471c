// Model name composition

/// `prefix.property`, or just `property` when the prefix is empty
pub fn create_property_model_name(prefix: &str, property: &str) -> String {
    if prefix.is_empty() {
        property.to_string()
    } else if property.is_empty() {
        prefix.to_string()
    } else {
        format!("{}.{}", prefix, property)
    }
}

/// `prefix[index]`, or `[index]` when the prefix is empty
pub fn create_index_model_name(prefix: &str, index: &str) -> String {
    format!("{}[{}]", prefix, index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_names() {
        assert_eq!(create_property_model_name("", "Name"), "Name");
        assert_eq!(create_property_model_name("order", "Name"), "order.Name");
        assert_eq!(create_property_model_name("order", ""), "order");
    }

    #[test]
    fn test_index_names() {
        assert_eq!(create_index_model_name("", "0"), "[0]");
        assert_eq!(create_index_model_name("items", "key"), "items[key]");
    }
}
