use crate::condition::Condition;
use crate::error::{Error, Result};
use crate::parser::parse_document;
use serde::Serialize;
use std::collections::BTreeSet;

/// List view descriptor read from a `<tree>` element.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    pub string: Option<String>,
    pub infinite: Option<String>,
    pub colors: Option<String>,
    pub status: Option<String>,
    pub editable: Option<String>,
    /// Names of the direct `<field>` children, in document order
    pub fields: Vec<String>,
}

/// Fields read by the row color and status conditions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldsInConditions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colors: Option<BTreeSet<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<BTreeSet<String>>,
}

impl Tree {
    /// Parse the first `<tree>` element of `xml`.
    pub fn parse(xml: &str) -> Result<Self> {
        let document = parse_document(xml)?;
        let element = document
            .find("tree")
            .ok_or_else(|| Error::Validation("No tree element found".to_string()))?;
        let attr = |name: &str| element.get(name).map(str::to_string);

        Ok(Tree {
            string: attr("string"),
            infinite: attr("infinite"),
            colors: attr("colors"),
            status: attr("status"),
            editable: attr("editable"),
            fields: element
                .children_named("field")
                .filter_map(|f| f.get("name"))
                .map(str::to_string)
                .collect(),
        })
    }

    pub fn fields_in_conditions(&self) -> Result<FieldsInConditions> {
        let involved = |text: &Option<String>| -> Result<Option<BTreeSet<String>>> {
            match text.as_deref() {
                Some(text) if !text.is_empty() => Ok(Some(Condition::parse(text)?.involved_fields())),
                _ => Ok(None),
            }
        };
        Ok(FieldsInConditions {
            colors: involved(&self.colors)?,
            status: involved(&self.status)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_attributes() {
        let tree = Tree::parse(
            r#"<tree string="Test String" infinite="True" editable="yes" status="active"/>"#,
        )
        .unwrap();
        assert_eq!(tree.string.as_deref(), Some("Test String"));
        assert_eq!(tree.infinite.as_deref(), Some("True"));
        assert_eq!(tree.editable.as_deref(), Some("yes"));
        assert_eq!(tree.status.as_deref(), Some("active"));
        assert_eq!(tree.colors, None);
    }

    #[test]
    fn test_parse_fields() {
        let tree = Tree::parse(r#"<tree><field name="field1"/><field name="field2"/></tree>"#).unwrap();
        assert_eq!(tree.fields, vec!["field1", "field2"]);
    }

    #[test]
    fn test_fields_in_conditions() {
        let tree = Tree::parse(
            r#"<tree colors="red:state=='error';blue:state=='done';green:state=='draft';" status="green:active==True"/>"#,
        )
        .unwrap();
        let fields = tree.fields_in_conditions().unwrap();
        assert_eq!(
            serde_json::to_value(&fields).unwrap(),
            json!({"colors": ["state"], "status": ["active"]})
        );
    }

    #[test]
    fn test_fields_in_conditions_without_conditions() {
        let tree = Tree::parse(r#"<tree string="Plain"/>"#).unwrap();
        assert_eq!(tree.fields_in_conditions().unwrap(), FieldsInConditions::default());
        assert_eq!(serde_json::to_value(FieldsInConditions::default()).unwrap(), json!({}));
    }

    #[test]
    fn test_missing_tree_element() {
        assert!(matches!(Tree::parse("<form/>"), Err(Error::Validation(_))));
    }
}
