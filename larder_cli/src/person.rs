use larder::ObjectShape;
use std::fmt;

/// The record every subcommand works on: a person with a name, an optional age, and an ordered
/// list of favorite foods.
#[derive(Clone, Debug, ObjectShape, PartialEq)]
#[fixed_fields("kind" => "person")]
pub struct Person {
    pub object_id: Option<i64>,
    pub name: String,
    pub age: Option<i64>,
    #[field("favoriteFoods")]
    pub favorite_foods: Vec<String>,
}

impl Person {
    pub fn new(name: String, age: Option<i64>, favorite_foods: Vec<String>) -> Person {
        Person {
            object_id: None,
            name,
            age,
            favorite_foods,
        }
    }
}

impl fmt::Display for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.object_id {
            Some(id) => write!(f, "#{} {}", id, self.name)?,
            None => write!(f, "{}", self.name)?,
        }

        if let Some(age) = self.age {
            write!(f, " (age {})", age)?;
        }

        if !self.favorite_foods.is_empty() {
            write!(f, " likes {}", self.favorite_foods.join(", "))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn people_display_readably() {
        let mut person = Person::new(
            "Mary".to_string(),
            Some(34),
            vec!["pizza".to_string(), "fries".to_string()],
        );

        assert_eq!(person.to_string(), "Mary (age 34) likes pizza, fries");

        person.object_id = Some(3);
        person.age = None;
        person.favorite_foods.clear();
        assert_eq!(person.to_string(), "#3 Mary");
    }
}
