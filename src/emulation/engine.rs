use std::sync::Arc;

use crate::{
    assembly::Instruction,
    emulation::{EmValue, HeapRef, ManagedHeap},
    metadata::{
        corlib,
        field::FieldRef,
        method::{MethodRef, CTOR},
        module::Module,
        resolver::ModuleResolver,
        token::Token,
        typesystem::{TypeAttributes, TypeRef},
    },
    runtime::{self, ChangeTracker, TrackerLookup},
    Error, Result,
};

/// Default maximum depth of nested calls
pub const DEFAULT_MAX_CALL_DEPTH: usize = 256;

type Resolved = (Arc<Module>, Token);

/// Executes method bodies of loaded modules.
///
/// The emulator owns a [`ModuleResolver`] holding every module it can execute code from
/// and a [`ManagedHeap`] with the objects created so far. Methods implemented by the
/// runtime (the tracker members, `System.Object::.ctor`, attribute constructors) are
/// dispatched natively.
///
/// # Examples
///
/// ```rust
/// use dotweave::builders::TypeBuilder;
/// use dotweave::emulation::{EmValue, Emulator};
/// use dotweave::metadata::corlib;
/// use dotweave::Module;
///
/// let mut module = Module::new("Contracts");
/// TypeBuilder::class("Contracts", "Person")
///     .auto_property("Name", corlib::string())
///     .build(&mut module)?;
///
/// let mut emulator = Emulator::new()?;
/// emulator.load(module);
/// let person = emulator.create_instance("Contracts", "Contracts.Person", &[])?;
/// emulator.set_property(person, "Name", "ivan".into())?;
/// assert_eq!(emulator.get_property(person, "Name")?, EmValue::from("ivan"));
/// # Ok::<(), dotweave::Error>(())
/// ```
pub struct Emulator {
    resolver: ModuleResolver,
    heap: ManagedHeap,
    max_call_depth: usize,
}

impl Emulator {
    /// Create an emulator with the core library and runtime support module loaded
    ///
    /// # Errors
    ///
    /// Only fails if the synthesized modules are inconsistent, which indicates a bug.
    pub fn new() -> Result<Self> {
        Ok(Self::with_resolver(ModuleResolver::new()?))
    }

    /// Create an emulator resolving modules through `resolver`
    pub fn with_resolver(resolver: ModuleResolver) -> Self {
        Emulator {
            resolver,
            heap: ManagedHeap::new(),
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }

    /// Limit the depth of nested calls
    #[must_use]
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Make `module` executable, replacing a loaded module of the same name
    pub fn load(&mut self, module: Module) -> Arc<Module> {
        self.resolver.register(module)
    }

    /// The resolver holding the loaded modules
    pub fn resolver(&self) -> &ModuleResolver {
        &self.resolver
    }

    /// The managed heap
    pub fn heap(&self) -> &ManagedHeap {
        &self.heap
    }

    /// Allocate an instance of `full_name` from `module` and run the constructor taking
    /// `args.len()` arguments
    ///
    /// # Errors
    ///
    /// Returns resolution errors for unknown modules, types or constructors and any error
    /// raised while running the constructor.
    pub fn create_instance(&mut self, module: &str, full_name: &str, args: &[EmValue]) -> Result<HeapRef> {
        let declaring = self.resolver.resolve_module(module)?;
        let token = declaring
            .find_type(full_name)
            .ok_or_else(|| Error::TypeNotFound(format!("[{module}]{full_name}")))?;
        let class = declaring.type_ref(token)?;
        let params = args.iter().map(|_| corlib::object()).collect();

        let instance = self.new_object(&MethodRef::constructor(class, params), args.to_vec(), 0)?;
        instance
            .as_object()
            .ok_or_else(|| Error::Emulation(format!("{full_name} is not a class")))
    }

    /// Call the instance method `name` of `object` with virtual dispatch
    ///
    /// # Errors
    ///
    /// Returns [`Error::MemberNotFound`] if the object's type hierarchy has no such method and
    /// any error raised while running it.
    pub fn invoke(&mut self, object: HeapRef, name: &str, args: Vec<EmValue>) -> Result<Option<EmValue>> {
        let class = self.heap.get(object)?.class.clone();
        let (module, token) = self.find_in_hierarchy(&class, name, args.len())?;
        self.execute(module, token, Some(EmValue::ObjectRef(object)), args, 1)
    }

    /// Read a property of `object`, public or not, declared anywhere in its type hierarchy
    ///
    /// # Errors
    ///
    /// Returns [`Error::MemberNotFound`] if no such property with a getter exists and any error
    /// raised while running the getter.
    pub fn get_property(&mut self, object: HeapRef, name: &str) -> Result<EmValue> {
        let (module, getter) = self.find_accessor(object, name, true)?;
        self.execute(module, getter, Some(EmValue::ObjectRef(object)), Vec::new(), 1)?
            .ok_or_else(|| Error::Emulation(format!("getter of {name} returned nothing")))
    }

    /// Write a property of `object`, public or not, declared anywhere in its type hierarchy
    ///
    /// # Errors
    ///
    /// Returns [`Error::MemberNotFound`] if no such property with a setter exists and any error
    /// raised while running the setter.
    pub fn set_property(&mut self, object: HeapRef, name: &str, value: EmValue) -> Result<()> {
        let (module, setter) = self.find_accessor(object, name, false)?;
        self.execute(module, setter, Some(EmValue::ObjectRef(object)), vec![value], 1)?;
        Ok(())
    }

    /// True if the runtime type of `object` implements the trackable interface
    pub fn is_trackable(&self, object: HeapRef) -> bool {
        let Ok(instance) = self.heap.get(object) else {
            return false;
        };
        self.hierarchy(&instance.class)
            .map(|chain| {
                chain.iter().any(|(module, token)| {
                    module
                        .type_def(*token)
                        .is_ok_and(|def| def.implements(runtime::TRACKABLE))
                })
            })
            .unwrap_or(false)
    }

    /// The tracker of `object`, as returned by its `Tracker` property
    pub fn tracker_of(&self, object: HeapRef) -> Option<Arc<ChangeTracker>> {
        if !self.is_trackable(object) {
            return None;
        }
        let class = self.heap.get(object).ok()?.class.clone();
        let (module, getter) = self.find_in_hierarchy(&class, runtime::GET_TRACKER, 0).ok()?;
        let body = module.method(getter).ok()?.body.as_ref()?;
        let field = body.significant().find_map(|instruction| match instruction {
            Instruction::LdFld(field) => Some(field),
            _ => None,
        })?;
        match self.heap.load_field(object, field).ok()? {
            EmValue::Tracker(tracker) => Some(tracker),
            _ => None,
        }
    }

    fn find_accessor(&self, object: HeapRef, name: &str, getter: bool) -> Result<Resolved> {
        let class = self.heap.get(object)?.class.clone();
        for (module, token) in self.hierarchy(&class)? {
            let Some(property) = module.find_property(token, name) else {
                continue;
            };
            let def = module.property(property)?;
            let accessor = if getter { def.getter } else { def.setter };
            return match accessor {
                Some(accessor) => Ok((module.clone(), accessor)),
                None => Err(Error::MemberNotFound(format!(
                    "property {} of {} has no {}",
                    name,
                    class,
                    if getter { "getter" } else { "setter" }
                ))),
            };
        }
        Err(Error::MemberNotFound(format!("{class} has no property {name}")))
    }

    /// The resolved type chain of `class`, most derived first
    fn hierarchy(&self, class: &TypeRef) -> Result<Vec<Resolved>> {
        let mut chain = Vec::new();
        let mut current = Some(class.clone());
        while let Some(class) = current {
            if chain.len() > self.max_call_depth {
                return Err(malformed_error!("inheritance chain of {} loops", class));
            }
            let (module, token) = self.resolver.resolve_type(&class)?;
            current = module.type_def(token)?.base.clone();
            chain.push((module, token));
        }
        Ok(chain)
    }

    fn find_in_hierarchy(&self, class: &TypeRef, name: &str, param_count: usize) -> Result<Resolved> {
        for (module, token) in self.hierarchy(class)? {
            if let Some(method) = module.find_method(token, name, param_count) {
                return Ok((module, method));
            }
        }
        Err(Error::MemberNotFound(format!("{class}::{name}/{param_count}")))
    }

    fn is_enum(&self, declared: &TypeRef) -> bool {
        self.resolver
            .resolve_type(declared)
            .ok()
            .and_then(|(module, token)| module.type_def(token).ok().map(|def| def.is_enum()))
            .unwrap_or(false)
    }

    fn allocate(&mut self, class: &TypeRef) -> Result<HeapRef> {
        let chain = self.hierarchy(class)?;
        if let Some((module, token)) = chain.first() {
            let def = module.type_def(*token)?;
            if def.is_interface() || def.flags.contains(TypeAttributes::ABSTRACT) {
                return Err(Error::Emulation(format!("cannot instantiate {class}")));
            }
        }

        let mut fields = Vec::new();
        for (module, token) in chain {
            let def = module.type_def(token)?;
            let declaring = module.type_full_name(token)?;
            for &field in &def.fields {
                let field = module.field(field)?;
                if field.is_static() {
                    continue;
                }
                let initial = EmValue::default_for(&field.field_type, self.is_enum(&field.field_type));
                fields.push(((declaring.clone(), field.name.clone()), initial));
            }
        }
        Ok(self.heap.alloc(class.definition(), fields))
    }

    fn new_object(&mut self, ctor: &MethodRef, args: Vec<EmValue>, depth: usize) -> Result<EmValue> {
        if ctor.declaring.is(runtime::CHANGE_TRACKER) {
            let target = args
                .first()
                .and_then(EmValue::as_object)
                .ok_or_else(|| Error::Emulation("tracker constructed without a target".into()))?;
            return Ok(EmValue::Tracker(ChangeTracker::new(target)));
        }

        let object = self.allocate(&ctor.declaring)?;
        let (module, declaring) = self.resolver.resolve_type(&ctor.declaring)?;
        let constructor = module
            .find_method(declaring, CTOR, ctor.params.len())
            .ok_or_else(|| Error::MemberNotFound(ctor.to_string()))?;
        self.execute(module, constructor, Some(EmValue::ObjectRef(object)), args, depth + 1)?;
        Ok(EmValue::ObjectRef(object))
    }

    fn call(
        &mut self,
        method: &MethodRef,
        virtual_call: bool,
        this: Option<EmValue>,
        args: Vec<EmValue>,
        depth: usize,
    ) -> Result<Option<EmValue>> {
        log::trace!("call {} at depth {}", method, depth);
        match &this {
            Some(EmValue::Tracker(tracker)) => return self.call_tracker(tracker.clone(), method, args),
            Some(EmValue::Null) => {
                return Err(Error::Emulation(format!("null reference calling {method}")))
            }
            _ => {}
        }

        let (module, token) = match (&this, virtual_call) {
            (Some(EmValue::ObjectRef(object)), true) => {
                let class = self.heap.get(*object)?.class.clone();
                self.find_in_hierarchy(&class, &method.name, method.params.len())?
            }
            _ => self.find_in_hierarchy(&method.declaring, &method.name, method.params.len())?,
        };
        self.execute(module, token, this, args, depth + 1)
    }

    fn call_tracker(&mut self, tracker: Arc<ChangeTracker>, method: &MethodRef, args: Vec<EmValue>) -> Result<Option<EmValue>> {
        match (method.name.as_str(), args.as_slice()) {
            (runtime::BEFORE_TARGET_PROPERTY_CHANGE, [old_value, new_value]) => {
                tracker.before_target_property_change(old_value, new_value, &*self);
            }
            (runtime::NOTIFY_BEFORE_CHANGE, [sender]) => {
                tracker.notify_before_change(sender.as_object().unwrap_or(tracker.target()));
            }
            (runtime::DETACH_ALL, []) => tracker.detach_all(),
            _ => return Err(Error::MemberNotFound(method.to_string())),
        }
        Ok(None)
    }

    fn execute(
        &mut self,
        module: Arc<Module>,
        token: Token,
        this: Option<EmValue>,
        args: Vec<EmValue>,
        depth: usize,
    ) -> Result<Option<EmValue>> {
        if depth > self.max_call_depth {
            return Err(Error::RecursionLimit(self.max_call_depth));
        }

        let method = module.method(token)?;
        if method.params.len() != args.len() {
            return Err(Error::Emulation(format!(
                "{} takes {} arguments, got {}",
                method.name,
                method.params.len(),
                args.len()
            )));
        }
        let Some(body) = &method.body else {
            return self.execute_native(&module, token);
        };

        let arguments: Vec<EmValue> = this.into_iter().chain(args).collect();
        let mut locals = vec![EmValue::Null; usize::from(body.local_count)];
        let mut stack: Vec<EmValue> = Vec::with_capacity(usize::from(body.max_stack));

        for instruction in &body.instructions {
            match instruction {
                Instruction::Nop => {}
                Instruction::LdArg(n) => {
                    let value = arguments
                        .get(usize::from(*n))
                        .cloned()
                        .ok_or_else(|| Error::Emulation(format!("no argument {n}")))?;
                    stack.push(value);
                }
                Instruction::LdLoc(n) => {
                    let value = locals
                        .get(usize::from(*n))
                        .cloned()
                        .ok_or_else(|| Error::Emulation(format!("no local {n}")))?;
                    stack.push(value);
                }
                Instruction::StLoc(n) => {
                    let value = pop(&mut stack)?;
                    let slot = locals
                        .get_mut(usize::from(*n))
                        .ok_or_else(|| Error::Emulation(format!("no local {n}")))?;
                    *slot = value;
                }
                Instruction::LdNull => stack.push(EmValue::Null),
                Instruction::LdStr(value) => stack.push(EmValue::from(value.as_str())),
                Instruction::LdcI4(value) => stack.push(EmValue::I32(*value)),
                Instruction::LdcI8(value) => stack.push(EmValue::I64(*value)),
                Instruction::LdcR8(value) => stack.push(EmValue::F64(*value)),
                Instruction::Dup => {
                    let top = stack
                        .last()
                        .cloned()
                        .ok_or_else(|| Error::Emulation("stack underflow".into()))?;
                    stack.push(top);
                }
                Instruction::Pop => {
                    pop(&mut stack)?;
                }
                Instruction::LdFld(field) => {
                    let object = pop(&mut stack)?;
                    stack.push(self.heap.load_field(instance(&object, field)?, field)?);
                }
                Instruction::StFld(field) => {
                    let value = pop(&mut stack)?;
                    let object = pop(&mut stack)?;
                    self.heap.store_field(instance(&object, field)?, field, value)?;
                }
                Instruction::Call(callee) | Instruction::CallVirt(callee) => {
                    let call_args = pop_n(&mut stack, callee.params.len())?;
                    let receiver = if callee.has_this {
                        Some(pop(&mut stack)?)
                    } else {
                        None
                    };
                    let virtual_call = matches!(instruction, Instruction::CallVirt(_));
                    let result = self.call(callee, virtual_call, receiver, call_args, depth)?;
                    if let (Some(result), true) = (result, callee.return_type.is_some()) {
                        stack.push(result);
                    }
                }
                Instruction::NewObj(ctor) => {
                    let ctor_args = pop_n(&mut stack, ctor.params.len())?;
                    let object = self.new_object(ctor, ctor_args, depth)?;
                    stack.push(object);
                }
                Instruction::Ret => {
                    return if method.return_type.is_some() {
                        Ok(Some(pop(&mut stack)?))
                    } else {
                        Ok(None)
                    };
                }
            }
        }
        Err(Error::Emulation(format!(
            "{} ends without ret",
            module.method_ref(token)?
        )))
    }

    fn execute_native(&mut self, module: &Module, token: Token) -> Result<Option<EmValue>> {
        let method = module.method(token)?;
        // Native constructors (System.Object, System.Attribute) have no observable effect
        if method.is_internal_call() && method.is_constructor() {
            return Ok(None);
        }
        Err(Error::Emulation(format!(
            "{} has no body",
            module.method_ref(token)?
        )))
    }
}

impl TrackerLookup for Emulator {
    fn tracker_of(&self, value: &EmValue) -> Option<Arc<ChangeTracker>> {
        value.as_object().and_then(|object| Emulator::tracker_of(self, object))
    }
}

fn pop(stack: &mut Vec<EmValue>) -> Result<EmValue> {
    stack
        .pop()
        .ok_or_else(|| Error::Emulation("stack underflow".into()))
}

fn pop_n(stack: &mut Vec<EmValue>, count: usize) -> Result<Vec<EmValue>> {
    if stack.len() < count {
        return Err(Error::Emulation("stack underflow".into()));
    }
    Ok(stack.split_off(stack.len() - count))
}

fn instance(value: &EmValue, field: &FieldRef) -> Result<HeapRef> {
    match value {
        EmValue::ObjectRef(object) => Ok(*object),
        EmValue::Null => Err(Error::Emulation(format!("null reference accessing {field}"))),
        other => Err(Error::Emulation(format!("{other} has no field {field}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        builders::{PropertyBuilder, TypeBuilder},
        metadata::method::{MethodAttributes, Param},
    };

    fn person_module() -> Result<Module> {
        let mut module = Module::new("People");
        let person = TypeBuilder::class("People", "Person")
            .auto_property("Name", corlib::string())
            .auto_property("Age", corlib::int32())
            .constructor(vec![Param::new("name", corlib::string())], |this, asm| {
                asm.ldarg_0()
                    .call(MethodRef::constructor(corlib::object(), Vec::new()))
                    .ldarg_0()
                    .ldarg_1()
                    .call(MethodRef::instance(this.clone(), "set_Name", vec![corlib::string()]))
                    .ret();
            })
            .method(
                "Describe",
                MethodAttributes::PUBLIC | MethodAttributes::VIRTUAL,
                Vec::new(),
                Some(corlib::string()),
                |_, asm| {
                    asm.ldstr("person").ret();
                },
            )
            .build(&mut module)?;
        let person = module.type_ref(person)?;

        TypeBuilder::class("People", "Employee")
            .extends(person.clone())
            .constructor(vec![Param::new("name", corlib::string())], move |_, asm| {
                asm.ldarg_0()
                    .ldarg_1()
                    .call(MethodRef::constructor(person, vec![corlib::string()]))
                    .ret();
            })
            .method(
                "Describe",
                MethodAttributes::PUBLIC | MethodAttributes::VIRTUAL,
                Vec::new(),
                Some(corlib::string()),
                |_, asm| {
                    asm.ldstr("employee").ret();
                },
            )
            .method(
                "Loop",
                MethodAttributes::PUBLIC,
                Vec::new(),
                None,
                |this, asm| {
                    asm.ldarg_0()
                        .call(MethodRef::instance(this.clone(), "Loop", Vec::new()))
                        .ret();
                },
            )
            .build(&mut module)?;
        Ok(module)
    }

    #[test]
    fn test_constructor_and_properties() -> Result<()> {
        let mut emulator = Emulator::new()?;
        emulator.load(person_module()?);

        let person = emulator.create_instance("People", "People.Person", &["ivan".into()])?;
        assert_eq!(emulator.get_property(person, "Name")?, EmValue::from("ivan"));
        assert_eq!(emulator.get_property(person, "Age")?, EmValue::I32(0));

        emulator.set_property(person, "Age", 42.into())?;
        assert_eq!(emulator.get_property(person, "Age")?, EmValue::I32(42));
        assert!(!emulator.is_trackable(person));
        assert!(emulator.tracker_of(person).is_none());
        Ok(())
    }

    #[test]
    fn test_inherited_state_and_virtual_dispatch() -> Result<()> {
        let mut emulator = Emulator::new()?;
        emulator.load(person_module()?);

        let employee = emulator.create_instance("People", "People.Employee", &["vasyly".into()])?;
        assert_eq!(emulator.get_property(employee, "Name")?, EmValue::from("vasyly"));
        assert_eq!(emulator.heap().get(employee)?.field_count(), 2);
        assert_eq!(
            emulator.invoke(employee, "Describe", Vec::new())?,
            Some(EmValue::from("employee"))
        );
        Ok(())
    }

    #[test]
    fn test_unknown_members() -> Result<()> {
        let mut emulator = Emulator::new()?;
        emulator.load(person_module()?);
        let person = emulator.create_instance("People", "People.Person", &["ivan".into()])?;

        assert!(matches!(
            emulator.get_property(person, "Salary"),
            Err(Error::MemberNotFound(_))
        ));
        assert!(matches!(
            emulator.create_instance("People", "People.Manager", &[]),
            Err(Error::TypeNotFound(_))
        ));
        assert!(matches!(
            emulator.create_instance("People", "People.Person", &[]),
            Err(Error::MemberNotFound(_))
        ));
        Ok(())
    }

    #[test]
    fn test_recursion_limit() -> Result<()> {
        let mut emulator = Emulator::new()?.with_max_call_depth(16);
        emulator.load(person_module()?);
        let employee = emulator.create_instance("People", "People.Employee", &["ivan".into()])?;

        assert!(matches!(
            emulator.invoke(employee, "Loop", Vec::new()),
            Err(Error::RecursionLimit(16))
        ));
        Ok(())
    }

    #[test]
    fn test_write_only_property() -> Result<()> {
        let mut module = Module::new("Docs");
        TypeBuilder::class("Docs", "Document")
            .field("trash", corlib::string())
            .property(PropertyBuilder::new("Number", corlib::string()).setter(|this, asm| {
                asm.ldarg_0()
                    .ldarg_1()
                    .stfld(FieldRef::new(this.clone(), "trash", corlib::string()))
                    .ret();
            }))
            .build(&mut module)?;

        let mut emulator = Emulator::new()?;
        emulator.load(module);
        let document = emulator.create_instance("Docs", "Docs.Document", &[])?;
        emulator.set_property(document, "Number", "42".into())?;
        assert!(matches!(
            emulator.get_property(document, "Number"),
            Err(Error::MemberNotFound(_))
        ));
        Ok(())
    }
}
