use larder::{ConversionError, ObjectShapeWithId, Result, Q};
use larder_derive::ObjectShape;

#[test]
fn returns_query_helper() -> Result<(), ConversionError> {
    #[derive(ObjectShape)]
    #[fixed_fields("version" => 1, "kind" => "person")]
    struct QueriedShape {
        name: String,
    }

    assert_eq!(
        QueriedShape::q().build(),
        Q.equal("version", 1).equal("kind", "person").build()
    );

    Ok(())
}

#[test]
fn can_get_and_set_id() -> Result<(), ConversionError> {
    #[derive(ObjectShape)]
    struct IdShape {
        object_id: Option<i64>,
    }

    let mut shape = IdShape { object_id: None };
    assert_eq!(shape.get_object_id(), None);

    shape.set_object_id(49);
    assert_eq!(shape.get_object_id(), Some(49));

    Ok(())
}
