//! Integration tests for change-tracking weaving within a single module.
//!
//! Each test authors a small module with the builders, weaves it and then drives the woven
//! code through the emulator, counting the notifications raised by the runtime trackers.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use dotweave::{
    changetracking::TRACKER_FIELD,
    prelude::*,
    runtime::{change_tracker, get_tracker, CHANGE_TRACKER, REWRITTEN_ATTRIBUTE},
};

const NS: &str = "Tests";

fn rewrite(module: &mut Module, config: RewriteConfig) -> Result<RewriteReport> {
    ChangeTrackingRewriter::new(config)?.rewrite(module)
}

fn emulator_for(module: Module) -> Result<Emulator> {
    let mut emulator = Emulator::new()?;
    emulator.load(module);
    Ok(emulator)
}

fn create(emulator: &mut Emulator, name: &str) -> Result<HeapRef> {
    emulator.create_instance("Tests", &format!("{NS}.{name}"), &[])
}

/// Subscribe a counting listener to the tracker of `object`
fn count_changes(emulator: &Emulator, object: HeapRef) -> Arc<AtomicUsize> {
    let changes = Arc::new(AtomicUsize::new(0));
    let counter = changes.clone();
    let tracker = emulator
        .tracker_of(object)
        .expect("object does not expose a tracker");
    tracker.subscribe(Arc::new(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));
    changes
}

fn count(changes: &AtomicUsize) -> usize {
    changes.load(Ordering::SeqCst)
}

fn is_rewritten(module: &Module, full_name: &str) -> bool {
    module
        .find_type(full_name)
        .and_then(|token| module.type_def(token).ok())
        .is_some_and(|def| def.has_attribute(REWRITTEN_ATTRIBUTE))
}

/// A single marked class: every distinct write notifies, equal writes do not.
#[test]
fn test_single_class() -> Result<()> {
    let mut module = Module::new("Tests");
    TypeBuilder::class(NS, "Contractor")
        .track_changes()
        .auto_property("Name", corlib::string())
        .build(&mut module)?;

    let report = rewrite(&mut module, RewriteConfig::default())?;
    assert_eq!(report.types_woven, 1);
    assert_eq!(report.trackers_installed, 1);
    assert_eq!(report.properties_instrumented, 1);

    let mut emulator = emulator_for(module)?;
    let contractor = create(&mut emulator, "Contractor")?;
    assert!(emulator.is_trackable(contractor));
    let changes = count_changes(&emulator, contractor);

    emulator.set_property(contractor, "Name", "ivan".into())?;
    emulator.set_property(contractor, "Name", "vasyly".into())?;
    emulator.set_property(contractor, "Name", "vasyly".into())?;
    assert_eq!(count(&changes), 2);
    assert_eq!(emulator.get_property(contractor, "Name")?, EmValue::from("vasyly"));
    Ok(())
}

/// Two unrelated marked classes get independent trackers.
#[test]
fn test_two_classes() -> Result<()> {
    let mut module = Module::new("Tests");
    TypeBuilder::class(NS, "Contractor")
        .track_changes()
        .auto_property("Name", corlib::string())
        .build(&mut module)?;
    TypeBuilder::class(NS, "Document")
        .track_changes()
        .auto_property("Number", corlib::string())
        .build(&mut module)?;

    let report = rewrite(&mut module, RewriteConfig::default())?;
    assert_eq!(report.types_woven, 2);
    assert_eq!(report.trackers_installed, 2);

    let mut emulator = emulator_for(module)?;
    let contractor = create(&mut emulator, "Contractor")?;
    let document = create(&mut emulator, "Document")?;
    let contractor_changes = count_changes(&emulator, contractor);
    let document_changes = count_changes(&emulator, document);

    emulator.set_property(contractor, "Name", "ivan".into())?;
    assert_eq!((count(&contractor_changes), count(&document_changes)), (1, 0));
    emulator.set_property(document, "Number", "42".into())?;
    assert_eq!((count(&contractor_changes), count(&document_changes)), (1, 1));
    Ok(())
}

/// Classes outside any tracking root hierarchy are left alone.
#[test]
fn test_skip_not_marked() -> Result<()> {
    let mut module = Module::new("Tests");
    TypeBuilder::class(NS, "Contractor")
        .track_changes()
        .auto_property("Name", corlib::string())
        .build(&mut module)?;
    TypeBuilder::class(NS, "Document")
        .auto_property("Number", corlib::string())
        .build(&mut module)?;

    let report = rewrite(&mut module, RewriteConfig::default())?;
    assert_eq!(report.types_woven, 1);
    assert!(!is_rewritten(&module, "Tests.Document"));

    let mut emulator = emulator_for(module)?;
    let document = create(&mut emulator, "Document")?;
    assert!(!emulator.is_trackable(document));
    assert!(emulator.tracker_of(document).is_none());
    emulator.set_property(document, "Number", "42".into())?;
    Ok(())
}

/// A derived class shares the tracker of its marked abstract base.
#[test]
fn test_child_classes() -> Result<()> {
    let mut module = Module::new("Tests");
    let entity = TypeBuilder::class(NS, "Entity")
        .abstract_type()
        .track_changes()
        .auto_property("Id", corlib::guid())
        .build(&mut module)?;
    let entity_ref = module.type_ref(entity)?;
    let document = TypeBuilder::class(NS, "Document")
        .extends(entity_ref)
        .auto_property("Number", corlib::string())
        .build(&mut module)?;

    let report = rewrite(&mut module, RewriteConfig::default())?;
    assert_eq!(report.types_woven, 2);
    assert_eq!(report.trackers_installed, 1);
    assert!(module.find_field(entity, TRACKER_FIELD).is_some());
    assert!(module.find_field(document, TRACKER_FIELD).is_none());

    let mut emulator = emulator_for(module)?;
    let document = create(&mut emulator, "Document")?;
    let changes = count_changes(&emulator, document);

    emulator.set_property(document, "Number", "1".into())?;
    assert_eq!(count(&changes), 1);
    let id = uguid::guid!("6f3c9a64-58b4-4bd7-9d5c-1f0e2a7b3c11");
    emulator.set_property(document, "Id", id.into())?;
    assert_eq!(count(&changes), 2);
    Ok(())
}

/// Every simple property of a class is instrumented, whatever its value type.
#[test]
fn test_many_simple_properties() -> Result<()> {
    let mut module = Module::new("Tests");
    TypeBuilder::class(NS, "Document")
        .track_changes()
        .auto_property("Number", corlib::string())
        .auto_property("Sum", corlib::system("Decimal"))
        .auto_property("Pages", corlib::int32())
        .build(&mut module)?;

    let report = rewrite(&mut module, RewriteConfig::default())?;
    assert_eq!(report.properties_instrumented, 3);

    let mut emulator = emulator_for(module)?;
    let document = create(&mut emulator, "Document")?;
    let changes = count_changes(&emulator, document);

    emulator.set_property(document, "Number", "1".into())?;
    emulator.set_property(document, "Sum", EmValue::F64(1.5))?;
    emulator.set_property(document, "Pages", EmValue::I32(3))?;
    emulator.set_property(document, "Pages", EmValue::I32(3))?;
    assert_eq!(count(&changes), 3);
    Ok(())
}

/// A hand-written setter touching more than its backing field is not instrumented.
#[test]
fn test_track_only_auto_properties() -> Result<()> {
    let mut module = Module::new("Tests");
    TypeBuilder::class(NS, "Document")
        .track_changes()
        .field("number", corlib::string())
        .field("trash", corlib::string())
        .property(
            PropertyBuilder::new("Number", corlib::string())
                .getter(|this, asm| {
                    asm.ldarg_0()
                        .ldfld(FieldRef::new(this.clone(), "number", corlib::string()))
                        .ret();
                })
                .setter(|this, asm| {
                    asm.ldarg_0()
                        .ldarg_1()
                        .stfld(FieldRef::new(this.clone(), "number", corlib::string()))
                        .ldarg_0()
                        .ldarg_1()
                        .stfld(FieldRef::new(this.clone(), "trash", corlib::string()))
                        .ret();
                }),
        )
        .auto_property("Description", corlib::string())
        .build(&mut module)?;

    let report = rewrite(&mut module, RewriteConfig::default())?;
    assert_eq!(report.properties_instrumented, 1);

    let mut emulator = emulator_for(module)?;
    let document = create(&mut emulator, "Document")?;
    let changes = count_changes(&emulator, document);

    emulator.set_property(document, "Number", "42".into())?;
    assert_eq!(count(&changes), 0);
    emulator.set_property(document, "Description", "draft".into())?;
    assert_eq!(count(&changes), 1);
    Ok(())
}

/// A referenced class is woven too, and its changes bubble up to the referencing object
/// for as long as the reference holds.
#[test]
fn test_track_referenced_classes() -> Result<()> {
    let mut module = Module::new("Tests");
    let account = TypeBuilder::class(NS, "AccountInfo")
        .auto_property("Code", corlib::string())
        .build(&mut module)?;
    let account_ref = module.type_ref(account)?;
    TypeBuilder::class(NS, "Contractor")
        .track_changes()
        .auto_property("Name", corlib::string())
        .auto_property("Account", account_ref)
        .build(&mut module)?;

    let report = rewrite(&mut module, RewriteConfig::default())?;
    assert_eq!(report.types_woven, 2);
    assert_eq!(report.trackers_installed, 2);
    assert!(is_rewritten(&module, "Tests.AccountInfo"));

    let mut emulator = emulator_for(module)?;
    let contractor = create(&mut emulator, "Contractor")?;
    let account = create(&mut emulator, "AccountInfo")?;
    let contractor_changes = count_changes(&emulator, contractor);
    let account_changes = count_changes(&emulator, account);

    emulator.set_property(contractor, "Account", account.into())?;
    assert_eq!((count(&contractor_changes), count(&account_changes)), (1, 0));

    emulator.set_property(account, "Code", "40702".into())?;
    assert_eq!((count(&contractor_changes), count(&account_changes)), (2, 1));

    emulator.set_property(account, "Code", "40817".into())?;
    assert_eq!((count(&contractor_changes), count(&account_changes)), (3, 2));

    emulator.set_property(contractor, "Account", EmValue::Null)?;
    assert_eq!((count(&contractor_changes), count(&account_changes)), (4, 2));

    emulator.set_property(account, "Code", "30101".into())?;
    assert_eq!((count(&contractor_changes), count(&account_changes)), (4, 3));
    Ok(())
}

/// Assigning the same child twice to the same property does not duplicate the forwarding.
#[test]
fn test_reassign_same_child() -> Result<()> {
    let mut module = Module::new("Tests");
    let account = TypeBuilder::class(NS, "AccountInfo")
        .auto_property("Code", corlib::string())
        .build(&mut module)?;
    let account_ref = module.type_ref(account)?;
    TypeBuilder::class(NS, "Contractor")
        .track_changes()
        .auto_property("Account", account_ref)
        .build(&mut module)?;
    rewrite(&mut module, RewriteConfig::default())?;

    let mut emulator = emulator_for(module)?;
    let contractor = create(&mut emulator, "Contractor")?;
    let account = create(&mut emulator, "AccountInfo")?;
    let changes = count_changes(&emulator, contractor);

    emulator.set_property(contractor, "Account", account.into())?;
    emulator.set_property(contractor, "Account", account.into())?;
    assert_eq!(count(&changes), 1);

    let (Some(child), Some(parent)) = (emulator.tracker_of(account), emulator.tracker_of(contractor)) else {
        panic!("trackers missing");
    };
    assert_eq!(child.forwards_to(&parent), 1);

    emulator.set_property(account, "Code", "1".into())?;
    assert_eq!(count(&changes), 2);
    Ok(())
}

/// Enumeration properties notify, but the enumeration itself is not woven.
#[test]
fn test_enum_property() -> Result<()> {
    let mut module = Module::new("Tests");
    let user_type = TypeBuilder::enumeration(NS, "UserType")
        .enum_value("Main")
        .enum_value("Manager")
        .build(&mut module)?;
    let user_type_ref = module.type_ref(user_type)?;
    TypeBuilder::class(NS, "User")
        .track_changes()
        .auto_property("Type", user_type_ref)
        .build(&mut module)?;

    let report = rewrite(&mut module, RewriteConfig::default())?;
    assert_eq!(report.types_woven, 1);
    assert!(!is_rewritten(&module, "Tests.UserType"));

    let mut emulator = emulator_for(module)?;
    let user = create(&mut emulator, "User")?;
    let changes = count_changes(&emulator, user);

    assert_eq!(emulator.get_property(user, "Type")?, EmValue::I32(0));
    emulator.set_property(user, "Type", EmValue::I32(1))?;
    emulator.set_property(user, "Type", EmValue::I32(1))?;
    assert_eq!(count(&changes), 1);
    Ok(())
}

/// Interface-typed properties are instrumented without weaving the implementations.
#[test]
fn test_interface_property() -> Result<()> {
    let mut module = Module::new("Tests");
    let contract = TypeBuilder::interface(NS, "IContract")
        .property(PropertyBuilder::new("Number", corlib::string()).abstract_getter())
        .build(&mut module)?;
    let contract_ref = module.type_ref(contract)?;
    let implementation = TypeBuilder::class(NS, "Contract")
        .implements(contract_ref.clone())
        .auto_property("Number", corlib::string())
        .build(&mut module)?;
    TypeBuilder::class(NS, "Contractor")
        .track_changes()
        .auto_property("Contract", contract_ref)
        .build(&mut module)?;

    let report = rewrite(&mut module, RewriteConfig::default())?;
    assert_eq!(report.types_woven, 1);
    assert!(!is_rewritten(&module, "Tests.IContract"));
    assert!(module.find_field(implementation, TRACKER_FIELD).is_none());

    let mut emulator = emulator_for(module)?;
    let contractor = create(&mut emulator, "Contractor")?;
    let contract = create(&mut emulator, "Contract")?;
    let changes = count_changes(&emulator, contractor);

    emulator.set_property(contractor, "Contract", contract.into())?;
    assert_eq!(count(&changes), 1);
    emulator.set_property(contract, "Number", "7".into())?;
    assert_eq!(count(&changes), 1);
    Ok(())
}

/// A second run recognizes the marker and adds nothing.
#[test]
fn test_dont_process_twice() -> Result<()> {
    let mut module = Module::new("Tests");
    let contractor = TypeBuilder::class(NS, "Contractor")
        .track_changes()
        .auto_property("Name", corlib::string())
        .build(&mut module)?;

    let rewriter = ChangeTrackingRewriter::new(RewriteConfig::default())?;
    rewriter.rewrite(&mut module)?;
    let again = rewriter.rewrite(&mut module)?;
    assert_eq!(again, RewriteReport { types_reused: 1, ..RewriteReport::default() });

    let def = module.type_def(contractor)?;
    let trackers = def
        .fields
        .iter()
        .filter(|&&field| module.field(field).is_ok_and(|f| f.field_type.is(CHANGE_TRACKER)))
        .count();
    assert_eq!(trackers, 1);
    let markers = def
        .custom_attributes
        .iter()
        .filter(|attribute| attribute.attribute_type.is(REWRITTEN_ATTRIBUTE))
        .count();
    assert_eq!(markers, 1);

    let mut emulator = emulator_for(module)?;
    let contractor = create(&mut emulator, "Contractor")?;
    let changes = count_changes(&emulator, contractor);
    emulator.set_property(contractor, "Name", "ivan".into())?;
    assert_eq!(count(&changes), 1);
    Ok(())
}

/// A constructor assigning a property runs after the tracker is initialized.
#[test]
fn test_constructor_assigns_property() -> Result<()> {
    let mut module = Module::new("Tests");
    TypeBuilder::class(NS, "Contractor")
        .track_changes()
        .auto_property("Name", corlib::string())
        .constructor(vec![Param::new("name", corlib::string())], |this, asm| {
            asm.ldarg_0()
                .call(MethodRef::constructor(corlib::object(), Vec::new()))
                .ldarg_0()
                .ldarg_1()
                .call(MethodRef::instance(this.clone(), "set_Name", vec![corlib::string()]))
                .ret();
        })
        .build(&mut module)?;
    rewrite(&mut module, RewriteConfig::default())?;

    let mut emulator = emulator_for(module)?;
    let contractor = emulator.create_instance("Tests", "Tests.Contractor", &["ivan".into()])?;
    assert_eq!(emulator.get_property(contractor, "Name")?, EmValue::from("ivan"));
    let changes = count_changes(&emulator, contractor);
    emulator.set_property(contractor, "Name", "vasyly".into())?;
    assert_eq!(count(&changes), 1);
    Ok(())
}

/// A property of tracker type declared by the user is instrumented like any other and
/// exposes the tracker installed by the weaver.
#[test]
fn test_user_tracker_property_is_not_the_tracker() -> Result<()> {
    let mut module = Module::new("Tests");
    let person = TypeBuilder::class(NS, "Person")
        .track_changes()
        .auto_property("ConstructorTracker", change_tracker())
        .auto_property("Name", corlib::string())
        .constructor(Vec::new(), |this, asm| {
            asm.ldarg_0()
                .ldstr("default")
                .call(MethodRef::constructor(this.clone(), vec![corlib::string()]))
                .ret();
        })
        .constructor(vec![Param::new("name", corlib::string())], |this, asm| {
            asm.ldarg_0()
                .call(MethodRef::constructor(corlib::object(), Vec::new()))
                .ldarg_0()
                .ldarg_0()
                .callvirt(get_tracker())
                .call(MethodRef::instance(
                    this.clone(),
                    "set_ConstructorTracker",
                    vec![change_tracker()],
                ))
                .ldarg_0()
                .ldarg_1()
                .call(MethodRef::instance(this.clone(), "set_Name", vec![corlib::string()]))
                .ret();
        })
        .build(&mut module)?;

    let report = rewrite(&mut module, RewriteConfig::default())?;
    assert_eq!(report.trackers_installed, 1);
    assert!(module.find_field(person, TRACKER_FIELD).is_some());

    let mut emulator = emulator_for(module)?;
    for args in [Vec::new(), vec![EmValue::from("ivan")]] {
        let person = emulator.create_instance("Tests", "Tests.Person", &args)?;
        let Some(tracker) = emulator.tracker_of(person) else {
            panic!("Person does not expose a tracker");
        };
        let seen = emulator.get_property(person, "ConstructorTracker")?;
        assert!(matches!(seen, EmValue::Tracker(t) if Arc::ptr_eq(&t, &tracker)));

        let changes = count_changes(&emulator, person);
        emulator.set_property(person, "Name", "vasyly".into())?;
        assert_eq!(count(&changes), 1);
    }
    Ok(())
}

/// A hand-written field of tracker type does not replace the installed tracker.
#[test]
fn test_hand_written_tracker_field() -> Result<()> {
    let mut module = Module::new("Tests");
    let contractor = TypeBuilder::class(NS, "Contractor")
        .track_changes()
        .field("audit", change_tracker())
        .auto_property("Name", corlib::string())
        .build(&mut module)?;

    let report = rewrite(&mut module, RewriteConfig::default())?;
    assert_eq!((report.trackers_installed, report.properties_instrumented), (1, 1));
    assert!(module.find_field(contractor, TRACKER_FIELD).is_some());

    let mut emulator = emulator_for(module)?;
    let contractor = create(&mut emulator, "Contractor")?;
    let changes = count_changes(&emulator, contractor);
    emulator.set_property(contractor, "Name", "ivan".into())?;
    assert_eq!(count(&changes), 1);
    Ok(())
}

/// A marked base rejected by the foreign predicate does not make its subclasses roots.
#[test]
fn test_skip_foreign() -> Result<()> {
    let mut module = Module::new("Tests");
    let foreign = TypeBuilder::class("Vendor", "ForeignClass")
        .track_changes()
        .auto_property("Code", corlib::string())
        .build(&mut module)?;
    let foreign_ref = module.type_ref(foreign)?;
    TypeBuilder::class(NS, "Contractor")
        .extends(foreign_ref)
        .auto_property("Name", corlib::string())
        .build(&mut module)?;

    let config = RewriteConfig::default()
        .with_types(["Tests.Contractor"])
        .with_foreign_prefix("Tests.");
    let report = rewrite(&mut module, config)?;
    assert_eq!(report.types_woven, 0);
    assert!(!is_rewritten(&module, "Tests.Contractor"));

    let mut emulator = emulator_for(module)?;
    let contractor = create(&mut emulator, "Contractor")?;
    assert!(!emulator.is_trackable(contractor));
    Ok(())
}

/// Types selected in an earlier run are reused by a later run covering their subclasses.
#[test]
fn test_lookup_tracker_from_rewritten_parent() -> Result<()> {
    let mut module = Module::new("Tests");
    let parent = TypeBuilder::class(NS, "Parent")
        .track_changes()
        .auto_property("Name", corlib::string())
        .build(&mut module)?;
    let parent_ref = module.type_ref(parent)?;
    TypeBuilder::class(NS, "Child")
        .extends(parent_ref)
        .auto_property("Age", corlib::int32())
        .build(&mut module)?;

    let mut rewriter = ChangeTrackingRewriter::new(RewriteConfig::default().with_types(["Tests.Parent"]))?;
    let first = rewriter.rewrite(&mut module)?;
    assert_eq!(first.types_woven, 1);
    assert!(!is_rewritten(&module, "Tests.Child"));

    rewriter.config_mut().types_to_process = Some(vec!["Tests.Parent".into(), "Tests.Child".into()]);
    let second = rewriter.rewrite(&mut module)?;
    assert_eq!((second.types_woven, second.types_reused), (1, 1));
    assert_eq!(second.trackers_installed, 0);

    let mut emulator = emulator_for(module)?;
    let child = create(&mut emulator, "Child")?;
    let changes = count_changes(&emulator, child);
    emulator.set_property(child, "Age", EmValue::I32(30))?;
    emulator.set_property(child, "Name", "ivan".into())?;
    assert_eq!(count(&changes), 2);
    Ok(())
}

/// Names in the immutable set stop the recursion, the property itself still notifies.
#[test]
fn test_immutable_types() -> Result<()> {
    let mut module = Module::new("Tests");
    let timestamp = TypeBuilder::class(NS, "BsonTimestamp")
        .auto_property("Value", corlib::system("Int64"))
        .build(&mut module)?;
    let timestamp_ref = module.type_ref(timestamp)?;
    TypeBuilder::class(NS, "Contractor")
        .track_changes()
        .auto_property("Version", timestamp_ref)
        .build(&mut module)?;

    let report = rewrite(
        &mut module,
        RewriteConfig::default().with_immutable_type("BsonTimestamp"),
    )?;
    assert_eq!(report.types_woven, 1);
    assert!(!is_rewritten(&module, "Tests.BsonTimestamp"));

    let mut emulator = emulator_for(module)?;
    let contractor = create(&mut emulator, "Contractor")?;
    let version = create(&mut emulator, "BsonTimestamp")?;
    let changes = count_changes(&emulator, contractor);
    emulator.set_property(contractor, "Version", version.into())?;
    assert_eq!(count(&changes), 1);
    emulator.set_property(version, "Value", EmValue::I64(2))?;
    assert_eq!(count(&changes), 1);
    Ok(())
}

/// Array-typed properties weave their element type.
#[test]
fn test_array_property() -> Result<()> {
    let mut module = Module::new("Tests");
    let account = TypeBuilder::class(NS, "AccountInfo")
        .auto_property("Code", corlib::string())
        .build(&mut module)?;
    let accounts = module.type_ref(account)?.array();
    TypeBuilder::class(NS, "Contractor")
        .track_changes()
        .auto_property("Accounts", accounts)
        .build(&mut module)?;

    let report = rewrite(&mut module, RewriteConfig::default())?;
    assert_eq!(report.types_woven, 2);
    assert!(is_rewritten(&module, "Tests.AccountInfo"));
    Ok(())
}

/// Nested types are only roots when explicitly enabled.
#[test]
fn test_nested_types() -> Result<()> {
    let build = || -> Result<Module> {
        let mut module = Module::new("Tests");
        let outer = TypeBuilder::class(NS, "Outer").build(&mut module)?;
        TypeBuilder::class("", "Inner")
            .nested_in(outer)
            .track_changes()
            .auto_property("Name", corlib::string())
            .build(&mut module)?;
        Ok(module)
    };

    let mut module = build()?;
    let report = rewrite(&mut module, RewriteConfig::default())?;
    assert_eq!(report.types_woven, 0);
    assert!(!is_rewritten(&module, "Tests.Outer/Inner"));

    let mut module = build()?;
    let report = rewrite(&mut module, RewriteConfig::default().with_nested_types(true))?;
    assert_eq!(report.types_woven, 1);
    assert!(is_rewritten(&module, "Tests.Outer/Inner"));
    Ok(())
}

/// Compiler-generated classes are never roots.
#[test]
fn test_compiler_generated_skipped() -> Result<()> {
    let mut module = Module::new("Tests");
    TypeBuilder::class(NS, "<>c__DisplayClass0")
        .compiler_generated()
        .track_changes()
        .auto_property("Name", corlib::string())
        .build(&mut module)?;

    let report = rewrite(&mut module, RewriteConfig::default())?;
    assert_eq!(report, RewriteReport::default());
    Ok(())
}

/// Unknown candidates are reported instead of silently ignored.
#[test]
fn test_unknown_candidate() -> Result<()> {
    let mut module = Module::new("Tests");
    let result = rewrite(&mut module, RewriteConfig::default().with_types(["Tests.Missing"]));
    assert!(matches!(result, Err(Error::TypeNotFound(name)) if name == "[Tests]Tests.Missing"));
    Ok(())
}

/// A property referencing a type attributed to another, unprocessed module fails the run.
#[test]
fn test_crash_if_other_module_not_rewritten() -> Result<()> {
    let mut module = Module::new("Tests");
    let account = TypeBuilder::class(NS, "AccountInfo")
        .auto_property("Code", corlib::string())
        .build(&mut module)?;
    let account_ref = module.type_ref(account)?;
    TypeBuilder::class(NS, "Contractor")
        .track_changes()
        .auto_property("Account", account_ref)
        .build(&mut module)?;

    let config = RewriteConfig::default().with_module_of(|reference| {
        if reference.name == "AccountInfo" {
            "Accounts".to_string()
        } else {
            reference.module.clone()
        }
    });
    let Err(error) = rewrite(&mut module, config) else {
        panic!("rewrite should fail");
    };
    assert!(matches!(error, Error::NotRewrittenReference { .. }));
    assert_eq!(
        error.to_string(),
        "property Account of type Tests.Contractor references not rewritten type Tests.AccountInfo from module Accounts"
    );
    Ok(())
}

/// Self-referencing graphs fail by default and weave when cycles are accepted.
#[test]
fn test_cyclic_reference() -> Result<()> {
    let build = || -> Result<Module> {
        let mut module = Module::new("Tests");
        TypeBuilder::class(NS, "Node")
            .track_changes()
            .auto_property("Value", corlib::int32())
            .auto_property("Next", TypeRef::new("Tests", NS, "Node"))
            .build(&mut module)?;
        Ok(module)
    };

    let mut module = build()?;
    let result = rewrite(&mut module, RewriteConfig::default());
    assert!(matches!(result, Err(Error::CyclicReference(_))));

    let mut module = build()?;
    let report = rewrite(
        &mut module,
        RewriteConfig::default().with_cycle_policy(CyclePolicy::Accept),
    )?;
    assert_eq!(report.types_woven, 1);
    assert_eq!(report.properties_instrumented, 2);

    let mut emulator = emulator_for(module)?;
    let head = create(&mut emulator, "Node")?;
    let tail = create(&mut emulator, "Node")?;
    let head_changes = count_changes(&emulator, head);
    emulator.set_property(head, "Next", tail.into())?;
    emulator.set_property(tail, "Value", EmValue::I32(1))?;
    assert_eq!(count(&head_changes), 2);
    Ok(())
}
