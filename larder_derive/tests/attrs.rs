use predicates::prelude::*;
use larder::{object, ConversionError, Object, Result};
use larder_derive::ObjectShape;
use std::convert::TryFrom;

macro_rules! assert_is_err_matching {
    ($result:expr, $pattern:expr$(,)?) => {
        let predicate = predicate::str::is_match($pattern).expect("error pattern invalid");
        let error = &($result).err().expect("unexpected success").to_string();

        if let Some(case) = predicate.find_case(false, error) {
            panic!("Unexpected error, failed {:?}\n{:?}", case, error);
        }
    };
}

#[test]
fn can_convert_with_custom_field_names() -> Result<(), ConversionError> {
    #[derive(Debug, ObjectShape, PartialEq)]
    struct RenamedShape {
        #[field("my-name")]
        name: String,
        age: i64,
    }

    let shape: Object = RenamedShape {
        name: "Mary".to_string(),
        age: 34,
    }
    .into();

    assert_eq!(shape, object!("my-name" => "Mary", "age" => 34));

    let obj: Object = object!(
        "my-name" => "Mary",
        "age" => 34,
    );

    assert_eq!(
        RenamedShape::try_from(obj)?,
        RenamedShape {
            name: "Mary".to_string(),
            age: 34,
        }
    );

    Ok(())
}

#[test]
fn can_convert_with_fixed_fields() -> Result<(), ConversionError> {
    #[derive(Debug, ObjectShape, PartialEq)]
    #[fixed_fields("version" => 1, "kind" => "person")]
    struct KindedShape {
        name: String,
    }

    let shape: Object = KindedShape {
        name: "Mary".to_string(),
    }
    .into();

    assert_eq!(
        shape,
        object!(
            "kind" => "person",
            "version" => 1,
            "name" => "Mary",
        ),
    );

    let obj: Object = object!(
        "kind" => "person",
        "version" => 1,
        "name" => "Mary",
    );

    assert_eq!(
        KindedShape::try_from(obj)?,
        KindedShape {
            name: "Mary".to_string(),
        }
    );

    Ok(())
}

#[test]
fn converting_with_fixed_fields_fails_when_invalid() -> Result<(), ConversionError> {
    #[derive(Debug, ObjectShape, PartialEq)]
    #[fixed_fields("version" => 1, "kind" => "person")]
    struct KindedShapeInvalid {
        name: String,
    }

    assert_is_err_matching!(
        KindedShapeInvalid::try_from(object!(
            "kind" => "person",
            "name" => "Mary",
        )),
        "version.*missing",
    );

    assert_is_err_matching!(
        KindedShapeInvalid::try_from(object!(
            "kind" => "person",
            "version" => "one",
            "name" => "Mary",
        )),
        "version.*number",
    );

    assert_is_err_matching!(
        KindedShapeInvalid::try_from(object!(
            "kind" => "person",
            "version" => 2,
            "name" => "Mary",
        )),
        "fixed.*version.*1.*2",
    );

    assert_is_err_matching!(
        KindedShapeInvalid::try_from(object!(
            "kind" => "animal",
            "version" => 1,
            "name" => "Mary",
        )),
        "fixed.*kind.*person.*animal",
    );

    Ok(())
}
