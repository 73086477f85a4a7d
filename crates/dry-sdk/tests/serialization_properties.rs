use dry_sdk::dry_core::math::{Color, Quaternion, Vec2, Vec3, Vec4};
use dry_sdk::dry_core::variant::{ResourceRef, ResourceRefList};
use dry_sdk::prelude::*;
use std::rc::Rc;

#[derive(Object)]
struct Widget {
    base: ObjectBase,
    state: SerializableState,
    size: i32,
    name: String,
}

impl Serializable for Widget {
    fn serializable_state(&self) -> &SerializableState {
        &self.state
    }
    fn serializable_state_mut(&mut self) -> &mut SerializableState {
        &mut self.state
    }
}

/// Holds one attribute of every value type.
#[derive(Object)]
struct Sample {
    base: ObjectBase,
    state: SerializableState,
    int: i32,
    int64: i64,
    flag: bool,
    float: f32,
    double: f64,
    v2: Vec2,
    v3: Vec3,
    v4: Vec4,
    rotation: Quaternion,
    color: Color,
    text: String,
    buffer: Vec<u8>,
    resource: ResourceRef,
    resources: ResourceRefList,
    list: Vec<Variant>,
    strings: Vec<String>,
    map: VariantMap,
}

impl Serializable for Sample {
    fn serializable_state(&self) -> &SerializableState {
        &self.state
    }
    fn serializable_state_mut(&mut self) -> &mut SerializableState {
        &mut self.state
    }
}

const TEXTURE: StringHash = StringHash::new("Texture2D");

fn new_sample(context: &Rc<Context>) -> Sample {
    Sample {
        base: ObjectBase::new(context),
        state: SerializableState::default(),
        int: 0,
        int64: 0,
        flag: false,
        float: 0.0,
        double: 0.0,
        v2: Vec2::new(0.0, 0.0),
        v3: Vec3::new(0.0, 0.0, 0.0),
        v4: Vec4::new(0.0, 0.0, 0.0, 0.0),
        rotation: Quaternion::IDENTITY,
        color: Color::WHITE,
        text: String::new(),
        buffer: Vec::new(),
        resource: ResourceRef::new(TEXTURE, ""),
        resources: ResourceRefList::new(TEXTURE, Vec::new()),
        list: Vec::new(),
        strings: Vec::new(),
        map: VariantMap::new(),
    }
}

fn context() -> anyhow::Result<Rc<Context>> {
    let mut registry = TypeRegistry::new();
    registry.register_factory::<Widget, _>(|context: &Rc<Context>| Widget {
        base: ObjectBase::new(context),
        state: SerializableState::default(),
        size: 10,
        name: String::new(),
    })?;
    dry_attribute!(registry, Widget, "Size", size, 10, AttributeMode::DEFAULT)?;
    dry_attribute!(registry, Widget, "Name", name, String::new(), AttributeMode::DEFAULT)?;

    registry.register_factory::<Sample, _>(new_sample)?;
    let mode = AttributeMode::DEFAULT;
    dry_attribute!(registry, Sample, "Int", int, 0, mode)?;
    dry_attribute!(registry, Sample, "Int64", int64, 0i64, mode)?;
    dry_attribute!(registry, Sample, "Flag", flag, false, mode)?;
    dry_attribute!(registry, Sample, "Float", float, 0.0f32, mode)?;
    dry_attribute!(registry, Sample, "Double", double, 0.0f64, mode)?;
    dry_attribute!(registry, Sample, "Vector2", v2, Vec2::new(0.0, 0.0), mode)?;
    dry_attribute!(registry, Sample, "Vector3", v3, Vec3::new(0.0, 0.0, 0.0), mode)?;
    dry_attribute!(registry, Sample, "Vector4", v4, Vec4::new(0.0, 0.0, 0.0, 0.0), mode)?;
    dry_attribute!(registry, Sample, "Rotation", rotation, Quaternion::IDENTITY, mode)?;
    dry_attribute!(registry, Sample, "Color", color, Color::WHITE, mode)?;
    dry_attribute!(registry, Sample, "Text", text, String::new(), mode)?;
    dry_attribute!(registry, Sample, "Buffer", buffer, Vec::<u8>::new(), mode)?;
    dry_attribute!(registry, Sample, "Resource", resource, ResourceRef::new(TEXTURE, ""), mode)?;
    dry_attribute!(
        registry,
        Sample,
        "Resources",
        resources,
        ResourceRefList::new(TEXTURE, Vec::new()),
        mode
    )?;
    dry_attribute!(registry, Sample, "List", list, Vec::<Variant>::new(), mode)?;
    dry_attribute!(registry, Sample, "Strings", strings, Vec::<String>::new(), mode)?;
    dry_attribute!(registry, Sample, "Map", map, VariantMap::new(), mode)?;
    Ok(Context::new(registry))
}

fn populated_sample(context: &Rc<Context>) -> anyhow::Result<Sample> {
    let mut sample = new_sample(context);
    let mut map = VariantMap::new();
    map.insert(StringHash::new("Speed"), Variant::Float(2.5));
    map.insert(StringHash::new("Tag"), Variant::from("fast"));

    sample.set_attribute_by_name("Int", -7)?;
    sample.set_attribute_by_name("Int64", 1i64 << 40)?;
    sample.set_attribute_by_name("Flag", true)?;
    sample.set_attribute_by_name("Float", 0.25f32)?;
    sample.set_attribute_by_name("Double", 1.125f64)?;
    sample.set_attribute_by_name("Vector2", Vec2::new(1.0, -1.0))?;
    sample.set_attribute_by_name("Vector3", Vec3::new(1.0, 2.0, 3.0))?;
    sample.set_attribute_by_name("Vector4", Vec4::new(4.0, 3.0, 2.0, 1.0))?;
    sample.set_attribute_by_name("Rotation", Quaternion::new(0.0, 1.0, 0.0, 0.0))?;
    sample.set_attribute_by_name("Color", Color::RED)?;
    sample.set_attribute_by_name("Text", "hello")?;
    sample.set_attribute_by_name("Buffer", vec![0u8, 1, 254, 255])?;
    sample.set_attribute_by_name("Resource", ResourceRef::new(TEXTURE, "stone.png"))?;
    sample.set_attribute_by_name(
        "Resources",
        ResourceRefList::new(TEXTURE, vec!["a.png".to_owned(), "b.png".to_owned()]),
    )?;
    sample.set_attribute_by_name("List", vec![Variant::Int(1), Variant::from("two")])?;
    sample.set_attribute_by_name("Strings", vec!["x".to_owned(), "y".to_owned()])?;
    sample.set_attribute_by_name("Map", map)?;
    Ok(sample)
}

fn attribute_values(object: &dyn Serializable) -> anyhow::Result<Vec<Variant>> {
    let values = (0..object.num_attributes())
        .map(|index| object.get_attribute(index))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(values)
}

#[test]
fn widget_scenario() -> anyhow::Result<()> {
    dry_sdk::logging::init_for_tests();

    // --- 1. SETUP ---
    let context = context()?;
    let mut widget = context
        .create_object_by_name("Widget")
        .ok_or_else(|| anyhow::anyhow!("Widget is not registered"))?;
    widget.set_attribute_by_name("Size", 42)?;

    // --- 2. ACTION ---
    let mut bytes = Vec::new();
    widget.save(&mut bytes)?;
    let mut copy = context
        .create_object_by_name("Widget")
        .ok_or_else(|| anyhow::anyhow!("Widget is not registered"))?;
    copy.load(&mut bytes.as_slice())?;

    // --- 3. ASSERTIONS ---
    assert_eq!(copy.get_attribute_by_name("Size")?, Variant::Int(42));
    assert_eq!(copy.get_attribute_by_name("Name")?, Variant::from(""));
    Ok(())
}

#[test]
fn every_value_type_round_trips_in_binary() -> anyhow::Result<()> {
    let context = context()?;
    let sample = populated_sample(&context)?;

    let mut bytes = Vec::new();
    sample.save(&mut bytes)?;
    let mut copy = new_sample(&context);
    copy.load(&mut bytes.as_slice())?;

    assert_eq!(attribute_values(&copy)?, attribute_values(&sample)?);
    assert_eq!(copy.buffer, [0, 1, 254, 255]);
    Ok(())
}

#[test]
fn every_value_type_round_trips_in_text() -> anyhow::Result<()> {
    let context = context()?;
    let sample = populated_sample(&context)?;

    for format in [TextFormat::Ron, TextFormat::Json] {
        let text = sample.save_text(format)?;
        let mut copy = new_sample(&context);
        copy.load_text(&text, format)?;
        assert_eq!(attribute_values(&copy)?, attribute_values(&sample)?, "{format:?}");
    }
    Ok(())
}

#[test]
fn unknown_text_attributes_are_ignored() -> anyhow::Result<()> {
    let context = context()?;
    let text = r#"(
        type: "Widget",
        attributes: [
            (name: "Size", value: Int(5)),
            (name: "Sparkle", value: Bool(true)),
            (name: "Name", value: String("gear")),
        ],
    )"#;

    let mut widget = new_widget(&context);
    widget.load_text(text, TextFormat::Ron)?;

    assert_eq!(widget.size, 5);
    assert_eq!(widget.name, "gear");
    Ok(())
}

fn new_widget(context: &Rc<Context>) -> Widget {
    Widget {
        base: ObjectBase::new(context),
        state: SerializableState::default(),
        size: 10,
        name: String::new(),
    }
}

#[test]
fn default_instances_survive_a_round_trip_unchanged() -> anyhow::Result<()> {
    let context = context()?;
    let original = new_sample(&context);

    let mut bytes = Vec::new();
    original.save(&mut bytes)?;
    let mut from_binary = new_sample(&context);
    from_binary.load(&mut bytes.as_slice())?;

    let text = original.save_text(TextFormat::Ron)?;
    assert!(original.to_record()?.attributes.is_empty());
    let mut from_text = new_sample(&context);
    from_text.load_text(&text, TextFormat::Ron)?;

    let expected = attribute_values(&original)?;
    assert_eq!(attribute_values(&from_binary)?, expected);
    assert_eq!(attribute_values(&from_text)?, expected);
    Ok(())
}

#[test]
fn unknown_types_are_not_created() -> anyhow::Result<()> {
    let context = context()?;
    assert!(context.create_object(StringHash::new("Gadget")).is_none());
    assert!(context.create_object_by_name("").is_none());
    Ok(())
}
