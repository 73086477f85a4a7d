use dry_core::math::Vec3;
use dry_core::prelude::*;
use dry_scene::{BatchErrorPolicy, SceneFile, SceneSerializer, SerializationGoal};
use std::rc::Rc;

#[derive(Object)]
struct Node {
    base: ObjectBase,
    state: SerializableState,
    name: String,
    position: Vec3,
    parent: Option<ObjectId>,
}

impl Serializable for Node {
    fn serializable_state(&self) -> &SerializableState {
        &self.state
    }
    fn serializable_state_mut(&mut self) -> &mut SerializableState {
        &mut self.state
    }
}

#[derive(Object)]
struct Light {
    base: ObjectBase,
    state: SerializableState,
    intensity: f32,
}

impl Serializable for Light {
    fn serializable_state(&self) -> &SerializableState {
        &self.state
    }
    fn serializable_state_mut(&mut self) -> &mut SerializableState {
        &mut self.state
    }
}

fn register_node(registry: &mut TypeRegistry) -> Result<(), RegistryError> {
    registry.register_factory::<Node, _>(|context: &Rc<Context>| Node {
        base: ObjectBase::new(context),
        state: SerializableState::default(),
        name: String::new(),
        position: Vec3::new(0.0, 0.0, 0.0),
        parent: None,
    })?;
    dry_attribute!(registry, Node, "Name", name, String::new(), AttributeMode::DEFAULT)?;
    dry_attribute!(
        registry,
        Node,
        "Position",
        position,
        Vec3::new(0.0, 0.0, 0.0),
        AttributeMode::DEFAULT
    )?;
    dry_attribute!(
        registry,
        Node,
        "Parent",
        parent,
        None::<ObjectId>,
        AttributeMode::DEFAULT | AttributeMode::OBJECT_ID
    )?;
    Ok(())
}

fn register_light(registry: &mut TypeRegistry) -> Result<(), RegistryError> {
    registry.register_factory::<Light, _>(|context: &Rc<Context>| Light {
        base: ObjectBase::new(context),
        state: SerializableState::default(),
        intensity: 1.0,
    })?;
    dry_attribute!(registry, Light, "Intensity", intensity, 1.0f32, AttributeMode::DEFAULT)?;
    Ok(())
}

fn full_context() -> anyhow::Result<Rc<Context>> {
    let mut registry = TypeRegistry::new();
    register_node(&mut registry)?;
    register_light(&mut registry)?;
    Ok(Context::new(registry))
}

fn node_only_context() -> anyhow::Result<Rc<Context>> {
    let mut registry = TypeRegistry::new();
    register_node(&mut registry)?;
    Ok(Context::new(registry))
}

struct Scene {
    root: Box<Node>,
    child: Box<Node>,
    light: Box<Light>,
    scratch: Box<Node>,
}

fn build_scene(context: &Rc<Context>) -> anyhow::Result<Scene> {
    let missing = || anyhow::anyhow!("type not registered");
    let mut root = context.create::<Node>().ok_or_else(missing)?;
    root.set_attribute_by_name("Name", "root")?;

    let mut child = context.create::<Node>().ok_or_else(missing)?;
    child.set_attribute_by_name("Name", "child")?;
    child.set_attribute_by_name("Position", Vec3::new(1.0, 2.0, 3.0))?;
    child.set_attribute_by_name("Parent", root.id())?;

    let mut light = context.create::<Light>().ok_or_else(missing)?;
    light.set_attribute_by_name("Intensity", 4.5f32)?;

    let mut scratch = context.create::<Node>().ok_or_else(missing)?;
    scratch.set_attribute_by_name("Name", "scratch")?;
    scratch.set_temporary(true);

    Ok(Scene {
        root,
        child,
        light,
        scratch,
    })
}

impl Scene {
    fn objects(&self) -> Vec<&dyn Serializable> {
        let objects: [&dyn Serializable; 4] =
            [&*self.child, &*self.scratch, &*self.root, &*self.light];
        objects.to_vec()
    }
}

fn downcast<T: 'static>(object: &dyn Serializable) -> anyhow::Result<&T> {
    object
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| anyhow::anyhow!("unexpected type {}", object.type_name()))
}

#[test]
fn scene_round_trips_for_every_goal() -> anyhow::Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    for goal in [
        SerializationGoal::FastestLoad,
        SerializationGoal::SmallestFileSize,
        SerializationGoal::HumanReadableDebug,
        SerializationGoal::LongTermStability,
    ] {
        // --- 1. SETUP ---
        let context = full_context()?;
        let scene = build_scene(&context)?;
        let serializer = SceneSerializer::new();

        // --- 2. ACTION ---
        let file = serializer.save(&context, &scene.objects(), goal)?;
        let bytes = file.to_bytes();
        let loaded = serializer.load(
            &context,
            &SceneFile::from_bytes(&bytes)?,
            BatchErrorPolicy::Abort,
        )?;

        // --- 3. ASSERTIONS ---
        assert_eq!(loaded.len(), 3, "{goal:?}: the temporary node is not saved");
        let child = downcast::<Node>(loaded[0].as_ref())?;
        let root = downcast::<Node>(loaded[1].as_ref())?;
        let light = downcast::<Light>(loaded[2].as_ref())?;

        assert_eq!(child.name, "child");
        assert_eq!(child.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(child.parent, Some(root.id()), "{goal:?}");
        assert_ne!(root.id(), scene.root.id());
        assert_eq!(root.name, "root");
        assert_eq!(root.parent, None);
        assert_eq!(light.intensity, 4.5);
    }
    Ok(())
}

#[test]
fn text_scene_is_readable() -> anyhow::Result<()> {
    let context = full_context()?;
    let scene = build_scene(&context)?;

    let file = SceneSerializer::new().save(
        &context,
        &scene.objects(),
        SerializationGoal::HumanReadableDebug,
    )?;
    assert_eq!(file.header.encoding()?, "DRY_RON_V1");

    let text = String::from_utf8(file.payload)?;
    assert!(text.contains("\"child\""));
    assert!(text.contains("Intensity"));
    assert!(!text.contains("scratch"));
    Ok(())
}

#[test]
fn unregistered_types_are_skipped_on_load() -> anyhow::Result<()> {
    for goal in [SerializationGoal::FastestLoad, SerializationGoal::LongTermStability] {
        let source = full_context()?;
        let scene = build_scene(&source)?;
        let serializer = SceneSerializer::new();
        let file = serializer.save(&source, &scene.objects(), goal)?;

        let target = node_only_context()?;
        let loaded = serializer.load(&target, &file, BatchErrorPolicy::Abort)?;

        assert_eq!(loaded.len(), 2, "{goal:?}");
        assert!(loaded.iter().all(|o| o.type_name() == "Node"));
    }
    Ok(())
}

#[test]
fn scene_files_round_trip_through_disk() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("level.dryscene");

    let context = full_context()?;
    let scene = build_scene(&context)?;
    let serializer = SceneSerializer::new();
    serializer.save_to_path(&path, &context, &scene.objects(), SerializationGoal::FastestLoad)?;

    let loaded = serializer.load_from_path(&path, &context, BatchErrorPolicy::Abort)?;
    assert_eq!(loaded.len(), 3);
    assert_eq!(downcast::<Light>(loaded[2].as_ref())?.intensity, 4.5);
    Ok(())
}

#[test]
fn corrupt_files_are_rejected() -> anyhow::Result<()> {
    let context = full_context()?;
    let scene = build_scene(&context)?;
    let serializer = SceneSerializer::new();
    let mut bytes = serializer
        .save(&context, &scene.objects(), SerializationGoal::FastestLoad)?
        .to_bytes();

    bytes[0] = b'?';
    assert!(SceneFile::from_bytes(&bytes).is_err());
    Ok(())
}
