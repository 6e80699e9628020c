use super::*;
use crate::test_shaders::{texture_2d, uniform_buffer};

#[test]
fn add_and_get() {
    let mut mapping = ResourceMapping::new();
    let cb = uniform_buffer("cb");
    mapping.add_resource("Constants", Arc::clone(&cb), true).unwrap();

    let found = mapping.get_resource("Constants", 0).unwrap();
    assert!(Arc::ptr_eq(&found, &cb));
    assert!(mapping.get_resource("Constants", 1).is_none());
    assert!(mapping.get_resource("Missing", 0).is_none());
    assert_eq!(mapping.size(), 1);
}

#[test]
fn replacing_releases_the_old_object() {
    let mut mapping = ResourceMapping::new();
    let obj1 = uniform_buffer("obj1");
    let obj2 = uniform_buffer("obj2");

    mapping.add_resource("Res", Arc::clone(&obj1), false).unwrap();
    assert_eq!(Arc::strong_count(&obj1), 2);

    mapping.add_resource("Res", Arc::clone(&obj2), false).unwrap();
    assert_eq!(Arc::strong_count(&obj1), 1);
    assert_eq!(Arc::strong_count(&obj2), 2);
    assert!(Arc::ptr_eq(&mapping.get_resource("Res", 0).unwrap(), &obj2));
    assert_eq!(mapping.size(), 1);
}

#[test]
fn unique_insert_keeps_the_existing_entry() {
    let mut mapping = ResourceMapping::new();
    let obj1 = uniform_buffer("obj1");
    let obj2 = uniform_buffer("obj2");

    mapping.add_resource("Res", Arc::clone(&obj1), true).unwrap();
    let err = mapping.add_resource("Res", Arc::clone(&obj2), true).unwrap_err();
    assert_eq!(
        err,
        MappingError::Duplicate {
            name: "Res".into(),
            index: 0
        }
    );
    assert_eq!(
        err.to_string(),
        "resource 'Res' with array index 0 already exists in the resource mapping"
    );

    assert_eq!(Arc::strong_count(&obj1), 2);
    assert_eq!(Arc::strong_count(&obj2), 1);
    assert!(Arc::ptr_eq(&mapping.get_resource("Res", 0).unwrap(), &obj1));
}

#[test]
fn arrays_are_checked_before_insertion() {
    let mut mapping = ResourceMapping::new();
    let lights: Vec<_> = (0..3).map(|i| texture_2d(&format!("light{i}"))).collect();
    mapping.add_resource_array("g_Lights", 0, &lights[..2], true).unwrap();
    assert_eq!(mapping.size(), 2);

    // Index 1 collides; index 2 must not be inserted either.
    let err = mapping.add_resource_array("g_Lights", 1, &lights[1..], true).unwrap_err();
    assert_eq!(
        err,
        MappingError::Duplicate {
            name: "g_Lights".into(),
            index: 1
        }
    );
    assert!(mapping.get_resource("g_Lights", 2).is_none());

    mapping.add_resource_array("g_Lights", 1, &lights[1..], false).unwrap();
    assert_eq!(mapping.size(), 3);
    assert!(Arc::ptr_eq(&mapping.get_resource("g_Lights", 2).unwrap(), &lights[2]));
}

#[test]
fn remove_by_name() {
    let mut mapping = ResourceMapping::new();
    let tex = texture_2d("tex");
    mapping.add_resource_at("g_Tex", 1, Arc::clone(&tex), true).unwrap();
    assert_eq!(Arc::strong_count(&tex), 2);

    mapping.remove_resource_by_name("g_Tex", 0);
    assert_eq!(mapping.size(), 1);

    mapping.remove_resource_by_name("g_Tex", 1);
    assert!(mapping.is_empty());
    assert_eq!(Arc::strong_count(&tex), 1);

    mapping.remove_resource_by_name("never-added", 0);
}

#[test]
fn from_entries_rejects_duplicates() {
    let cb = uniform_buffer("cb");
    let mapping = ResourceMapping::from_entries([
        ResourceMappingEntry {
            name: "A".into(),
            object: Arc::clone(&cb),
            array_index: 0,
        },
        ResourceMappingEntry {
            name: "A".into(),
            object: Arc::clone(&cb),
            array_index: 1,
        },
    ])
    .unwrap();
    assert_eq!(mapping.size(), 2);

    let err = ResourceMapping::from_entries(
        ["B", "B"].map(|name| ResourceMappingEntry {
            name: name.into(),
            object: Arc::clone(&cb),
            array_index: 0,
        }),
    )
    .unwrap_err();
    assert!(matches!(err, MappingError::Duplicate { ref name, index: 0 } if name == "B"));
}
