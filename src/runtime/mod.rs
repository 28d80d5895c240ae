//! The runtime support module.
//!
//! Woven modules reference a small set of definitions that instrumented programs need at
//! execution time: the [`ChangeTracker`] class, the `ITrackable` interface exposing it, the
//! author-applied `TrackChangesAttribute` marking tracking roots and the tool-applied
//! `RewrittenForTrackChangesAttribute` recording that a type has been woven. The
//! definitions live in the `Dotweave.Runtime` module built by [`runtime_module`]; the
//! tracker methods carry no IL body and are dispatched natively by the emulator to
//! [`ChangeTracker`].

mod tracker;

pub use tracker::{ChangeTracker, Listener, NoTrackers, Subscriber, TrackerLookup};

use crate::{
    assembly::InstructionAssembler,
    metadata::{
        corlib,
        method::{MethodAttributes, MethodRef, Param, CTOR},
        module::Module,
        typesystem::{TypeAttributes, TypeRef},
    },
    Result,
};

/// Name of the runtime support module
pub const RUNTIME_MODULE: &str = "Dotweave.Runtime";
/// Namespace of the runtime support definitions
pub const RUNTIME_NAMESPACE: &str = "Dotweave.Runtime";

/// Full name of the tracker class
pub const CHANGE_TRACKER: &str = "Dotweave.Runtime.ChangeTracker";
/// Full name of the trackable interface
pub const TRACKABLE: &str = "Dotweave.Runtime.ITrackable";
/// Full name of the tracking root marker
pub const TRACK_CHANGES_ATTRIBUTE: &str = "Dotweave.Runtime.TrackChangesAttribute";
/// Full name of the processed marker
pub const REWRITTEN_ATTRIBUTE: &str = "Dotweave.Runtime.RewrittenForTrackChangesAttribute";

/// `ChangeTracker::BeforeTargetPropertyChange(object, object)`
pub const BEFORE_TARGET_PROPERTY_CHANGE: &str = "BeforeTargetPropertyChange";
/// `ChangeTracker::NotifyBeforeChange(object)`
pub const NOTIFY_BEFORE_CHANGE: &str = "NotifyBeforeChange";
/// `ChangeTracker::DetachAll()`
pub const DETACH_ALL: &str = "DetachAll";
/// Name of the tracker property of `ITrackable`
pub const TRACKER_PROPERTY: &str = "Tracker";
/// Name of the tracker property getter
pub const GET_TRACKER: &str = "get_Tracker";

fn runtime_type(name: &str) -> TypeRef {
    TypeRef::new(RUNTIME_MODULE, RUNTIME_NAMESPACE, name)
}

/// Reference to the tracker class
pub fn change_tracker() -> TypeRef {
    runtime_type("ChangeTracker")
}

/// Reference to the trackable interface
pub fn trackable() -> TypeRef {
    runtime_type("ITrackable")
}

/// Reference to the tracking root marker
pub fn track_changes_attribute() -> TypeRef {
    runtime_type("TrackChangesAttribute")
}

/// Reference to the processed marker
pub fn rewritten_attribute() -> TypeRef {
    runtime_type("RewrittenForTrackChangesAttribute")
}

/// `ChangeTracker::.ctor(object target)`
pub fn tracker_constructor() -> MethodRef {
    MethodRef::constructor(change_tracker(), vec![corlib::object()])
}

/// `ChangeTracker::BeforeTargetPropertyChange(object oldValue, object newValue)`
pub fn before_target_property_change() -> MethodRef {
    MethodRef::instance(
        change_tracker(),
        BEFORE_TARGET_PROPERTY_CHANGE,
        vec![corlib::object(), corlib::object()],
    )
}

/// `ITrackable::get_Tracker()`
pub fn get_tracker() -> MethodRef {
    MethodRef::instance(trackable(), GET_TRACKER, Vec::new()).returning(change_tracker())
}

/// Build the runtime support module
///
/// # Errors
///
/// Only fails if the module graph under construction is inconsistent, which indicates a bug.
pub fn runtime_module() -> Result<Module> {
    let mut module = Module::new(RUNTIME_MODULE);
    let native = MethodAttributes::PUBLIC
        | MethodAttributes::HIDE_BY_SIG
        | MethodAttributes::INTERNAL_CALL;
    let ctor = MethodAttributes::PUBLIC
        | MethodAttributes::HIDE_BY_SIG
        | MethodAttributes::SPECIAL_NAME
        | MethodAttributes::RT_SPECIAL_NAME;
    let param = |name: &str, param_type: TypeRef| Param {
        name: name.to_string(),
        param_type,
    };

    let tracker = module.add_type(
        RUNTIME_NAMESPACE,
        "ChangeTracker",
        TypeAttributes::PUBLIC | TypeAttributes::SEALED,
        Some(corlib::object()),
    )?;
    module.add_method(
        tracker,
        CTOR,
        ctor | MethodAttributes::INTERNAL_CALL,
        vec![param("target", corlib::object())],
        None,
        None,
    )?;
    module.add_method(
        tracker,
        BEFORE_TARGET_PROPERTY_CHANGE,
        native,
        vec![
            param("oldValue", corlib::object()),
            param("newValue", corlib::object()),
        ],
        None,
        None,
    )?;
    module.add_method(
        tracker,
        NOTIFY_BEFORE_CHANGE,
        native,
        vec![param("sender", corlib::object())],
        None,
        None,
    )?;
    module.add_method(tracker, DETACH_ALL, native, Vec::new(), None, None)?;

    let trackable_type = module.add_type(
        RUNTIME_NAMESPACE,
        "ITrackable",
        TypeAttributes::PUBLIC | TypeAttributes::INTERFACE | TypeAttributes::ABSTRACT,
        None,
    )?;
    let getter = module.add_method(
        trackable_type,
        GET_TRACKER,
        MethodAttributes::PUBLIC
            | MethodAttributes::HIDE_BY_SIG
            | MethodAttributes::SPECIAL_NAME
            | MethodAttributes::VIRTUAL
            | MethodAttributes::ABSTRACT,
        Vec::new(),
        Some(change_tracker()),
        None,
    )?;
    module.add_property(
        trackable_type,
        TRACKER_PROPERTY,
        change_tracker(),
        Some(getter),
        None,
    )?;

    let attribute_ctor = MethodRef::constructor(corlib::system("Attribute"), Vec::new());
    for name in ["TrackChangesAttribute", "RewrittenForTrackChangesAttribute"] {
        let attribute = module.add_type(
            RUNTIME_NAMESPACE,
            name,
            TypeAttributes::PUBLIC | TypeAttributes::SEALED,
            Some(corlib::system("Attribute")),
        )?;
        let body = InstructionAssembler::new()
            .ldarg_0()
            .call(attribute_ctor.clone())
            .ret()
            .finish();
        module.add_method(attribute, CTOR, ctor, Vec::new(), None, Some(body))?;
    }
    module.add_reference(corlib::CORLIB);

    Ok(module)
}
