//! This module defines abstract syntax tree (AST) types for SQL.

use enum_as_inner::EnumAsInner;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectClause {
    pub items: Vec<SelItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColName {
    pub name: String,
}

impl std::fmt::Display for ColName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.name.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, EnumAsInner)]
pub enum SelItem {
    CountStar,
    ColName(ColName),
    Star,
}

impl std::fmt::Display for SelItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelItem::CountStar => "COUNT(*)".fmt(f),
            SelItem::ColName(x) => x.fmt(f),
            SelItem::Star => "*".fmt(f),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FromClause {
    pub tablename: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectStatement {
    pub select: SelectClause,
    pub from: FromClause,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColDef {
    pub colname: ColName,
    /// The declared type, as written, or empty when no type was given.
    pub coltype: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateStatement {
    pub tablename: String,
    pub coldefs: Vec<ColDef>,
}

#[test]
fn test_display_sel_items() {
    let items = [
        SelItem::CountStar,
        SelItem::Star,
        SelItem::ColName(ColName {
            name: "color".to_string(),
        }),
    ];
    let shown: Vec<String> = items.iter().map(|i| i.to_string()).collect();
    assert_eq!(shown, vec!["COUNT(*)", "*", "color"]);
    assert!(items[0].is_count_star());
    assert_eq!(items[2].as_col_name().map(|c| c.name.as_str()), Some("color"));
}
