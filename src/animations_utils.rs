use std::marker::PhantomData;

use bevy::prelude::*;

/// Points from the entity carrying the glTF scene's `AnimationPlayer` back to
/// the logical root it animates (the player capsule, the companion, ...).
#[derive(Component, Reflect)]
#[relationship(relationship_target = HasAnimationRig)]
pub struct AnimationRigOf(pub Entity);

#[derive(Component, Reflect)]
#[relationship_target(relationship = AnimationRigOf)]
pub struct HasAnimationRig(Entity);

impl HasAnimationRig {
    pub fn rig_entity(&self) -> Entity {
        self.0
    }
}

/// Links any `AnimationPlayer` spawned below a `T` root back to that root.
#[derive(Default)]
pub struct LinkAnimationRigPluginFor<T: Component>(PhantomData<T>);

impl<T: Component> Plugin for LinkAnimationRigPluginFor<T> {
    fn build(&self, app: &mut App) {
        app.add_systems(PreUpdate, link_rig_for::<T>);
    }
}

fn link_rig_for<T: Component>(
    mut commands: Commands,
    rigs: Query<Entity, Added<AnimationPlayer>>,
    roots: Query<Entity, With<T>>,
    parents: Query<&ChildOf>,
) {
    for rig in rigs.iter() {
        let Some(root) = parents
            .iter_ancestors(rig)
            .find_map(|e| roots.get(e).ok())
        else {
            continue;
        };

        commands.entity(rig).insert(AnimationRigOf(root));
    }
}
