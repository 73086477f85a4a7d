use dry_core::prelude::*;
use std::rc::Rc;

#[derive(Object)]
struct Lantern {
    base: ObjectBase,
    state: SerializableState,
    lit: bool,
    color: dry_core::math::Color,
}

impl Serializable for Lantern {
    fn serializable_state(&self) -> &SerializableState {
        &self.state
    }
    fn serializable_state_mut(&mut self) -> &mut SerializableState {
        &mut self.state
    }
}

fn register_lantern(registry: &mut TypeRegistry) -> Result<(), RegistryError> {
    registry.register_factory_in_category::<Lantern, _>("Lights", |context: &Rc<Context>| Lantern {
        base: ObjectBase::new(context),
        state: SerializableState::default(),
        lit: false,
        color: dry_core::math::Color::WHITE,
    })?;
    dry_attribute!(registry, Lantern, "Is Lit", lit, false, AttributeMode::DEFAULT)?;
    dry_attribute!(
        registry,
        Lantern,
        "Color",
        color,
        dry_core::math::Color::WHITE,
        AttributeMode::FILE
    )?;
    Ok(())
}

dry_register!(register_lantern);

#[test]
fn submitted_types_are_registered() -> anyhow::Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let registry = TypeRegistry::with_submitted_types()?;
    let hash = StringHash::new("Lantern");

    assert!(registry.has_factory(hash));
    assert_eq!(registry.attributes(hash).len(), 2);
    assert_eq!(registry.types_in_category("Lights").len(), 1);
    Ok(())
}

#[test]
fn submitted_types_can_be_created_by_name() -> anyhow::Result<()> {
    let context = Context::new(TypeRegistry::with_submitted_types()?);
    let mut lantern = context
        .create_object_by_name("Lantern")
        .ok_or_else(|| anyhow::anyhow!("Lantern was not registered"))?;

    lantern.set_attribute_by_name("Color", dry_core::math::Color::RED)?;
    let text = lantern.save_text(TextFormat::Ron)?;
    assert!(text.contains("Color"));
    assert!(!text.contains("Is Lit"));
    Ok(())
}

#[test]
fn unknown_types_are_not_created() {
    let context = Context::new(TypeRegistry::new());
    assert!(context.create_object_by_name("Lantern").is_none());
    assert!(context.create_object(StringHash::new("Nothing")).is_none());
}
