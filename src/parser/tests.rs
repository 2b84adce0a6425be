use super::*;
use crate::ast::Constraints;
use crate::types::FkAction;

fn column(token: &str) -> FieldDescriptor {
    match parse_field(token).unwrap() {
        FieldSpec::Column(col) => col,
        other => panic!("expected column for '{}', got {:?}", token, other),
    }
}

#[test]
fn test_bare_name_defaults_to_text() {
    let col = column("title");
    assert_eq!(col.name, "title");
    assert_eq!(col.storage, StorageClass::Text);
    assert_eq!(col.constraints, Constraints::default());
    assert!(col.fk.is_none());
}

#[test]
fn test_type_and_short_flags() {
    let col = column("email:text!+");
    assert_eq!(col.storage, StorageClass::Text);
    assert!(col.constraints.not_null);
    assert!(col.constraints.unique);
    assert!(!col.constraints.index);
}

#[test]
fn test_flags_on_name_and_type_are_unioned() {
    let col = column("slug!:string+^");
    assert!(col.constraints.not_null);
    assert!(col.constraints.unique);
    assert!(col.constraints.index);
}

#[test]
fn test_flags_on_bare_name() {
    let col = column("code!+");
    assert_eq!(col.storage, StorageClass::Text);
    assert!(col.constraints.not_null && col.constraints.unique);
}

#[test]
fn test_primary_key_autoincrement() {
    let col = column("uid:int#~");
    assert_eq!(col.storage, StorageClass::Integer);
    assert!(col.constraints.primary_key);
    assert!(col.constraints.auto_increment);
}

#[test]
fn test_untyped_autoincrement_is_integer() {
    for token in ["uid#~", "uid,pk,ai"] {
        let col = column(token);
        assert_eq!(col.storage, StorageClass::Integer, "{}", token);
        assert!(col.constraints.primary_key && col.constraints.auto_increment);
    }
    assert_eq!(column("uid#").storage, StorageClass::Text);
}

#[test]
fn test_index_only_directive() {
    assert_eq!(
        parse_field("^email").unwrap(),
        FieldSpec::IndexOnly {
            column: "email".to_string()
        }
    );
    assert!(parse_field("^").is_err());
    assert!(parse_field("^9lives").is_err());
}

#[test]
fn test_fk_shorthand_defaults() {
    let col = column("user_id->users");
    assert_eq!(col.storage, StorageClass::Integer);
    let fk = col.fk.unwrap();
    assert_eq!(fk.table, "users");
    assert_eq!(fk.column, "id");
    assert_eq!(fk.on_delete, None);
    assert!(!fk.deferred);
}

#[test]
fn test_fk_shorthand_keeps_declared_type() {
    let col = column("user_id:text->users");
    assert_eq!(col.storage, StorageClass::Text);
    assert_eq!(col.fk.unwrap().table, "users");
}

#[test]
fn test_fk_bare_arrow_and_column() {
    let col = column("owner!>accounts(uid)");
    assert!(col.constraints.not_null);
    let fk = col.fk.unwrap();
    assert_eq!(fk.table, "accounts");
    assert_eq!(fk.column, "uid");
}

#[test]
fn test_fk_shorthand_with_trailing_attributes() {
    let col = column("author_id->users,ondelete=cascade,onupdate=restrict,defer");
    let fk = col.fk.unwrap();
    assert_eq!(fk.on_delete, Some(FkAction::Cascade));
    assert_eq!(fk.on_update, Some(FkAction::Restrict));
    assert!(fk.deferred);
}

#[test]
fn test_malformed_fk_target() {
    for token in [
        "user_id->",
        "user_id->users(",
        "user_id->users(id",
        "user_id->9users",
        "a->b(c)d",
    ] {
        let err = parse_field(token).unwrap_err();
        assert!(
            matches!(err, GlyphError::MalformedFieldSpec { .. }),
            "{} gave {:?}",
            token,
            err
        );
    }
}

#[test]
fn test_inline_fk_type() {
    let col = column("post_id:fk(posts.id),ondelete=setnull");
    assert_eq!(col.storage, StorageClass::Integer);
    let fk = col.fk.unwrap();
    assert_eq!(fk.table, "posts");
    assert_eq!(fk.column, "id");
    assert_eq!(fk.on_delete, Some(FkAction::SetNull));

    let col = column("post_id:FK(posts)");
    assert_eq!(col.fk.unwrap().column, "id");
}

#[test]
fn test_inline_fk_and_arrow_conflict() {
    assert!(parse_field("post_id:fk(posts.id)->posts").is_err());
}

#[test]
fn test_long_attributes() {
    let col = column("score:real,notnull,default=0.5,idx");
    assert_eq!(col.storage, StorageClass::Real);
    assert!(col.constraints.not_null);
    assert!(col.constraints.index);
    assert_eq!(col.constraints.default.as_deref(), Some("0.5"));
}

#[test]
fn test_default_with_commas_and_arrow() {
    let col = column("created:text,default=strftime('%s','now')");
    assert!(col.fk.is_none());
    assert_eq!(
        col.constraints.default.as_deref(),
        Some("strftime('%s','now')")
    );

    let col = column("flag:int,default=(1>0)");
    assert!(col.fk.is_none());
    assert_eq!(col.constraints.default.as_deref(), Some("(1>0)"));
}

#[test]
fn test_parameterised_type_passthrough() {
    let col = column("price:decimal(10,2)!");
    assert_eq!(col.storage, StorageClass::Other("DECIMAL(10,2)".to_string()));
    assert!(col.constraints.not_null);
}

#[test]
fn test_unknown_attribute() {
    let err = parse_field("name:text,shiny").unwrap_err();
    assert!(matches!(err, GlyphError::MalformedFieldSpec { .. }));
}

#[test]
fn test_fk_attribute_without_reference() {
    let err = parse_field("name:text,ondelete=cascade").unwrap_err();
    assert!(matches!(err, GlyphError::MalformedFieldSpec { .. }));
}

#[test]
fn test_autoincrement_requires_integer_primary_key() {
    for token in ["n:int~", "n:text#~", "n,ai"] {
        let err = parse_field(token).unwrap_err();
        assert!(
            matches!(err, GlyphError::InvalidConstraint { .. }),
            "{} gave {:?}",
            token,
            err
        );
    }
    assert!(parse_field("n:int,pk,ai").is_ok());
}

#[test]
fn test_equivalent_spellings_parse_identically() {
    let short = column("email:text!+");
    let long = column("email:string,UNIQUE,nn");
    assert_eq!(short, long);
}

#[test]
fn test_rejects_garbage() {
    for token in ["", "   ", "9col", "email:", "email:text?", "a b"] {
        assert!(parse_field(token).is_err(), "'{}' should fail", token);
    }
}

#[test]
fn test_split_top_level() {
    assert_eq!(split_top_level("a,b,c"), vec!["a", "b", "c"]);
    assert_eq!(
        split_top_level("p:decimal(10,2),default='a,b'"),
        vec!["p:decimal(10,2)", "default='a,b'"]
    );
    assert_eq!(split_top_level("a,"), vec!["a", ""]);
}

#[test]
fn test_is_identifier() {
    assert!(is_identifier("users"));
    assert!(is_identifier("_tmp2"));
    assert!(!is_identifier("2fast"));
    assert!(!is_identifier("user-s"));
    assert!(!is_identifier(""));
}
