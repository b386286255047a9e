use super::code_builder_exts::{parameter_registers, CodeBuilderExts};
use super::{runtime, Error};
use crate::dex::class_graph::{
    Annotation, AnnotationValue, ClassData, ClassGraph, ClassKind, ComponentFlag, ComponentType,
    ConstructorRole, FieldData, MethodData,
};
use crate::dex::code::{
    AccessKind, CodeBuilder, Instruction, InvokeKind, LabelGenerator, MethodRef, Register, SynLabel,
    ValueKind, MAX_FIXED_INVOKE_SLOTS,
};
use crate::dex::verifier::UninitializedThis;
use crate::dex::{
    BinaryName, ClassAccessFlags, FieldAccessFlags, FieldType, MethodAccessFlags,
    MethodDescriptor, Name, RenderDescriptor, UnqualifiedName, Visibility,
};
use crate::util::{RefId, Width};
use std::collections::HashMap;

/// Suffix appended to the platform class name to name its genesis class
pub const GENESIS_SUFFIX: &str = "$genesis";

/// Genesis class inserted under one platform class
struct GenesisHolder<'g> {
    /// Platform class the genesis class extends
    bottom: &'g ClassData<'g>,

    genesis: &'g ClassData<'g>,

    /// Program classes that extended `bottom` directly and get moved under `genesis`
    tops: Vec<&'g ClassData<'g>>,
}

/// Inserts genesis classes between platform component classes and the program classes extending
/// them
///
/// Visiting a component only collects the boundaries (and synthesizes the genesis classes and
/// wormhole constructors). The program classes are only moved under their genesis class in
/// [`GenesisBuilder::finish`], together with the rewrite of their `super` calls.
pub struct GenesisBuilder<'a, 'g> {
    class_graph: &'a ClassGraph<'g>,
    holders: Vec<GenesisHolder<'g>>,
    by_bottom: HashMap<RefId<'g, ClassData<'g>>, usize>,
}

impl<'a, 'g> GenesisBuilder<'a, 'g> {
    pub fn new(class_graph: &'a ClassGraph<'g>) -> GenesisBuilder<'a, 'g> {
        GenesisBuilder {
            class_graph,
            holders: vec![],
            by_bottom: HashMap::new(),
        }
    }

    /// Walk the hierarchy of one component type, starting at its platform root
    pub fn visit_component(
        &mut self,
        component: ComponentType,
        root: &'g ClassData<'g>,
    ) -> Result<(), Error> {
        log::debug!("Building genesis hierarchy of {:?} from {:?}", component, root);
        let mut stack = vec![root];
        while let Some(class) = stack.pop() {
            let flags = class.component.get().get(component);
            if flags.is_empty()
                || class.is_genesis.get()
                || class.name.as_str().starts_with(runtime::TITAN_SDK_PACKAGE)
                || !flags.intersects(ComponentFlag::DIRECT | ComponentFlag::SUPER)
            {
                continue;
            }

            if class.is_program() {
                self.visit_program_class(component, class, flags)?;
            }

            let mut subclasses = class.subclasses();
            subclasses.reverse();
            stack.extend(subclasses);
        }
        Ok(())
    }

    fn visit_program_class(
        &mut self,
        component: ComponentType,
        class: &'g ClassData<'g>,
        flags: ComponentFlag,
    ) -> Result<(), Error> {
        if flags.contains(ComponentFlag::DIRECT) {
            let constructor = class
                .find_method(&UnqualifiedName::INIT, &MethodDescriptor::void(vec![]))
                .ok_or_else(|| Error::MissingDirectComponentConstructor(class.name.clone()))?;
            constructor.role.set(ConstructorRole::ComponentDirect);
        }

        if flags.contains(ComponentFlag::SUPER) {
            self.add_wormhole_constructor(class)?;
        }

        if let Some(superclass) = class.superclass() {
            if superclass.is_library() {
                let idx = self.genesis_for(component, superclass)?;
                let tops = &mut self.holders[idx].tops;
                if !tops.iter().any(|top| std::ptr::eq(*top, class)) {
                    tops.push(class);
                }
            }
        }
        Ok(())
    }

    /// `<init>(BuddyInitContext)` that does nothing but call the same constructor on the
    /// superclass
    fn add_wormhole_constructor(&self, class: &'g ClassData<'g>) -> Result<(), Error> {
        let superclass = match class.superclass() {
            Some(superclass) => superclass,
            None => return Ok(()),
        };
        let mut code = CodeBuilder::new();
        code.push(Instruction::invoke(
            InvokeKind::Direct,
            vec![Register::param(0), Register::param(1)],
            runtime::buddy_constructor(&superclass.name),
        ));
        code.push(Instruction::ReturnVoid);

        let wormhole = self.class_graph.add_method(
            MethodData::new(
                class,
                UnqualifiedName::INIT,
                runtime::buddy_constructor_descriptor(),
                MethodAccessFlags::PUBLIC
                    | MethodAccessFlags::CONSTRUCTOR
                    | MethodAccessFlags::SYNTHETIC,
            )
            .with_code(code.result(2)?),
        )?;
        wormhole.role.set(ConstructorRole::Wormhole);
        log::trace!("Added wormhole constructor to {:?}", class);
        Ok(())
    }

    /// Index of the genesis class extending `bottom`, creating it on first use
    fn genesis_for(
        &mut self,
        component: ComponentType,
        bottom: &'g ClassData<'g>,
    ) -> Result<usize, Error> {
        let component_flags = ComponentFlag::SUPER | ComponentFlag::GENESIS;
        if let Some(idx) = self.by_bottom.get(&RefId(bottom)) {
            let genesis = self.holders[*idx].genesis;
            genesis
                .component
                .set(genesis.component.get().with(component, component_flags));
            return Ok(*idx);
        }

        let genesis = self.class_graph.add_class(ClassData::new(
            bottom.name.with_suffix(GENESIS_SUFFIX),
            ClassKind::Program,
            Some(bottom),
            ClassAccessFlags::PUBLIC,
        ))?;
        genesis.is_genesis.set(true);
        genesis
            .component
            .set(genesis.component.get().with(component, component_flags));
        genesis.add_annotation(Annotation::marker(BinaryName::GENESIS_TYPE));
        self.class_graph.add_field(FieldData::new(
            genesis,
            UnqualifiedName::BUDDY_OBJ,
            FieldType::OBJECT,
            FieldAccessFlags::PUBLIC | FieldAccessFlags::SYNTHETIC,
        ))?;

        let stubs = self.add_virtual_stubs(bottom, genesis)?;
        let constructors = self.add_constructors(bottom, genesis)?;
        self.add_dispatcher_constructor(genesis, &constructors)?;
        log::debug!(
            "Created {:?} with {} virtual stubs and {} constructors",
            genesis,
            stubs,
            constructors.len()
        );

        let idx = self.holders.len();
        self.holders.push(GenesisHolder {
            bottom,
            genesis,
            tops: vec![],
        });
        self.by_bottom.insert(RefId(bottom), idx);
        Ok(idx)
    }

    /// Override every overridable virtual method with a call to the platform implementation
    fn add_virtual_stubs(
        &self,
        bottom: &'g ClassData<'g>,
        genesis: &'g ClassData<'g>,
    ) -> Result<usize, Error> {
        let vtable = overridable_methods(bottom);
        for method in &vtable {
            let target = MethodRef::new(
                bottom.name.clone(),
                method.name.clone(),
                method.descriptor.clone(),
            );
            let mut args = vec![Register::param(0)];
            args.extend(
                parameter_registers(&method.descriptor, true)
                    .into_iter()
                    .map(|(register, _)| register),
            );

            let mut code = CodeBuilder::new();
            code.push(invoke(InvokeKind::Super, args, target));
            let return_type = method.descriptor.return_type.as_ref();
            if let Some(typ) = return_type {
                code.push(Instruction::MoveResult(
                    ValueKind::of(typ),
                    Register::local(0).with_wide(typ.is_wide()),
                ));
            }
            code.return_value(return_type, Register::local(0));

            let access_flags =
                method.access_flags() - MethodAccessFlags::ABSTRACT - MethodAccessFlags::NATIVE;
            self.class_graph.add_method(
                MethodData::new(
                    genesis,
                    method.name.clone(),
                    method.descriptor.clone(),
                    access_flags,
                )
                .with_code(code.result(method.parameter_registers())?),
            )?;
        }
        Ok(vtable.len())
    }

    /// Redeclare the public and protected constructors of the platform class, numbered in
    /// `@GenesisInitMethod`
    fn add_constructors(
        &self,
        bottom: &'g ClassData<'g>,
        genesis: &'g ClassData<'g>,
    ) -> Result<Vec<&'g MethodData<'g>>, Error> {
        let mut inherited: Vec<&'g MethodData<'g>> = bottom
            .methods
            .iter()
            .filter(|method| method.is_constructor())
            .filter(|method| {
                matches!(
                    method.access_flags().visibility(),
                    Visibility::Public | Visibility::Protected
                )
            })
            .collect();
        inherited.sort_by_key(|method| method.descriptor.render());

        let mut constructors = vec![];
        for (id, constructor) in inherited.into_iter().enumerate() {
            let mut args = vec![Register::param(0)];
            args.extend(
                parameter_registers(&constructor.descriptor, true)
                    .into_iter()
                    .map(|(register, _)| register),
            );
            let mut code = CodeBuilder::new();
            code.push(invoke(InvokeKind::Direct, args, constructor.to_ref()));
            code.push(Instruction::ReturnVoid);

            let annotation = Annotation::marker(BinaryName::GENESIS_INIT_METHOD)
                .with_element(UnqualifiedName::METHODID, AnnotationValue::Int(id as i32));
            let redeclared = self.class_graph.add_method(
                MethodData::new(
                    genesis,
                    UnqualifiedName::INIT,
                    constructor.descriptor.clone(),
                    MethodAccessFlags::PUBLIC | MethodAccessFlags::CONSTRUCTOR,
                )
                .with_annotation(annotation)
                .with_code(code.result(constructor.parameter_registers())?),
            )?;
            redeclared.genesis_init_id.set(Some(id as u32));
            constructors.push(redeclared);
        }
        Ok(constructors)
    }

    /// `<init>(BuddyInitContext)` picking one of the redeclared constructors by id, with the
    /// arguments stashed in the current `BuddyInitHolder`
    fn add_dispatcher_constructor(
        &self,
        genesis: &'g ClassData<'g>,
        constructors: &[&'g MethodData<'g>],
    ) -> Result<(), Error> {
        let method_id = Register::local(0);
        let holder = Register::local(1);
        let paras = Register::local(2);
        let index = Register::local(3);
        let context = Register::param(1);

        let mut code = CodeBuilder::new();
        code.push(Instruction::InstanceGet(
            AccessKind::Plain,
            method_id,
            context,
            runtime::buddy_init_method_id(),
        ));
        code.push(Instruction::invoke(
            InvokeKind::Virtual,
            vec![context],
            runtime::buddy_current(),
        ));
        code.push(Instruction::MoveResult(ValueKind::Object, holder));
        code.push(Instruction::InstanceGet(
            AccessKind::Object,
            paras,
            holder,
            runtime::buddy_holder_paras(),
        ));

        let mut cases: Vec<(i32, SynLabel, &'g MethodData<'g>)> = vec![];
        for constructor in constructors {
            let id = constructor
                .genesis_init_id
                .get()
                .ok_or_else(|| Error::MissingGenesisConstructorId(format!("{:?}", constructor)))?;
            cases.push((id as i32, code.fresh_label(), constructor));
        }
        code.push(Instruction::SparseSwitch(
            method_id,
            cases.iter().map(|(id, label, _)| (*id, *label)).collect(),
        ));

        // No constructor with that id
        let exception = Register::local(0);
        let message = Register::local(1);
        code.push(Instruction::NewInstance(
            exception,
            BinaryName::ILLEGALSTATEEXCEPTION,
        ));
        code.push(Instruction::ConstString(
            message,
            String::from("unknown genesis constructor id"),
        ));
        code.push(Instruction::invoke(
            InvokeKind::Direct,
            vec![exception, message],
            MethodRef::new(
                BinaryName::ILLEGALSTATEEXCEPTION,
                UnqualifiedName::INIT,
                MethodDescriptor::void(vec![FieldType::STRING]),
            ),
        ));
        code.push(Instruction::Throw(exception));

        let done = code.fresh_label();
        for (_, label, constructor) in cases {
            code.place_label(label);
            let range = constructor.parameter_registers() as usize > MAX_FIXED_INVOKE_SLOTS;
            let mut args = vec![];
            let mut next = if range {
                let receiver = Register::local(4);
                code.push(Instruction::Move(ValueKind::Object, receiver, Register::param(0)));
                args.push(receiver);
                5
            } else {
                args.push(Register::param(0));
                4
            };
            for (idx, typ) in constructor.descriptor.parameters.iter().enumerate() {
                let register = Register::local(next).with_wide(typ.is_wide());
                code.load_unboxed(register, paras, index, idx as i32, typ);
                args.push(register);
                next += typ.width() as u16;
            }
            code.push(invoke(InvokeKind::Direct, args, constructor.to_ref()));
            code.push(Instruction::Goto(done));
        }
        code.place_label(done);
        code.push(Instruction::ReturnVoid);

        let dispatcher = self.class_graph.add_method(
            MethodData::new(
                genesis,
                UnqualifiedName::INIT,
                runtime::buddy_constructor_descriptor(),
                MethodAccessFlags::PUBLIC
                    | MethodAccessFlags::CONSTRUCTOR
                    | MethodAccessFlags::SYNTHETIC,
            )
            .with_code(code.result(2)?),
        )?;
        dispatcher.role.set(ConstructorRole::Wormhole);
        Ok(())
    }

    /// Move the collected program classes under their genesis classes
    ///
    /// Every `super(...)` constructor call and `super.m(...)` call that targeted the platform
    /// class is retargeted at the genesis class in the same step, so no call is left pointing
    /// past the new superclass.
    pub fn finish(self) -> Result<Vec<&'g ClassData<'g>>, Error> {
        let mut genesis_classes = vec![];
        for holder in self.holders {
            for top in &holder.tops {
                self.class_graph.reparent(top, holder.genesis);
                let rewritten = retarget_super_calls(top, holder.bottom, holder.genesis)?;
                log::debug!(
                    "Moved {:?} under {:?}, retargeted {} calls",
                    top,
                    holder.genesis,
                    rewritten
                );
            }
            genesis_classes.push(holder.genesis);
        }
        Ok(genesis_classes)
    }
}

/// Fixed-form invoke if the arguments fit, range form otherwise
///
/// Only used for argument lists which are contiguous to begin with.
fn invoke(kind: InvokeKind, args: Vec<Register>, method: MethodRef) -> Instruction {
    if method.descriptor.parameter_length(kind != InvokeKind::Static) > MAX_FIXED_INVOKE_SLOTS {
        Instruction::invoke_range(kind, args, method)
    } else {
        Instruction::invoke(kind, args, method)
    }
}

/// Virtual methods a subclass of `class` could override, from `java/lang/Object` down
///
/// Overrides replace what they override, and final methods are dropped at every level.
fn overridable_methods<'g>(class: &'g ClassData<'g>) -> Vec<&'g MethodData<'g>> {
    let mut chain: Vec<&'g ClassData<'g>> = std::iter::once(class)
        .chain(class.superclasses())
        .collect();
    chain.reverse();

    let mut vtable: Vec<&'g MethodData<'g>> = vec![];
    for class in chain {
        for method in class.methods.iter() {
            let flags = method.access_flags();
            if method.is_static()
                || method.name.is_init()
                || method.name.is_clinit()
                || flags.contains(MethodAccessFlags::CONSTRUCTOR)
                || !matches!(flags.visibility(), Visibility::Public | Visibility::Protected)
            {
                continue;
            }
            vtable.retain(|existing| {
                existing.name != method.name || existing.descriptor != method.descriptor
            });
            vtable.push(method);
        }
        vtable.retain(|method| !method.access_flags().contains(MethodAccessFlags::FINAL));
    }
    vtable
}

fn retarget_super_calls<'g>(
    class: &'g ClassData<'g>,
    bottom: &'g ClassData<'g>,
    genesis: &'g ClassData<'g>,
) -> Result<usize, Error> {
    let mut rewritten = 0;
    for method in class.methods.iter() {
        let mut code = method.code.borrow_mut();
        let code = match code.as_mut() {
            Some(code) => code,
            None => continue,
        };

        // `super(...)`, only on the receiver under construction
        if method.is_constructor() {
            let analysis = UninitializedThis::analyze(code)?;
            for init in analysis.delegated_inits() {
                if let Instruction::Invoke { method: target, .. } =
                    &mut code.instructions[init.position]
                {
                    if target.class == bottom.name {
                        *target = target.with_class(genesis.name.clone());
                        rewritten += 1;
                    }
                }
            }
        }

        // `super.m(...)`
        for instruction in code.instructions.iter_mut() {
            if let Instruction::Invoke {
                kind: InvokeKind::Super,
                method: target,
                ..
            } = instruction
            {
                if target.class == bottom.name {
                    *target = target.with_class(genesis.name.clone());
                    rewritten += 1;
                }
            }
        }
    }
    Ok(rewritten)
}
