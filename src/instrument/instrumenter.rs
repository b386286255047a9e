use super::{
    access, components, fields, marks, Dispatch, Error, GenesisBuilder, InitForm, Settings,
};
use super::{
    assign_method_ids, instrument_constructor, instrument_method, instrument_static_initializer,
};
use crate::dex::class_graph::{ClassData, ClassGraph, ComponentType, ConstructorRole, MethodData};
use crate::dex::{BinaryName, MethodDescriptor, UnqualifiedName};

/// What happened to one numbered method
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct MethodReport {
    pub name: UnqualifiedName,
    pub descriptor: MethodDescriptor<BinaryName>,
    pub method_id: u32,

    /// How the method dispatches to its interceptor (`None` if it was left as it is, and for the
    /// static initializer, which has a protocol of its own)
    pub dispatch: Option<Dispatch>,

    pub instrumented: bool,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ClassReport {
    pub name: BinaryName,

    /// Numbered methods, in id order
    pub methods: Vec<MethodReport>,
}

impl ClassReport {
    pub fn method(
        &self,
        name: &UnqualifiedName,
        descriptor: &MethodDescriptor<BinaryName>,
    ) -> Option<&MethodReport> {
        self.methods
            .iter()
            .find(|method| &method.name == name && &method.descriptor == descriptor)
    }
}

/// Outcome of an instrumentation run, which patch generation later needs to line up method ids
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct InstrumentReport {
    /// Instrumented classes, in class graph order
    pub classes: Vec<ClassReport>,

    /// Genesis classes created (full mode only)
    pub genesis_classes: Vec<BinaryName>,
}

impl InstrumentReport {
    pub fn class(&self, name: &BinaryName) -> Option<&ClassReport> {
        self.classes.iter().find(|class| &class.name == name)
    }
}

/// Runs every instrumentation pass over a class graph
pub struct Instrumenter<'a, 'g> {
    settings: Settings,
    class_graph: &'a ClassGraph<'g>,
}

impl<'a, 'g> Instrumenter<'a, 'g> {
    pub fn new(settings: Settings, class_graph: &'a ClassGraph<'g>) -> Instrumenter<'a, 'g> {
        Instrumenter {
            settings,
            class_graph,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Instrument the whole program
    ///
    /// Any error aborts the run, leaving the class graph partially rewritten.
    pub fn run(&self) -> Result<InstrumentReport, Error> {
        let settings = &self.settings;
        let class_graph = self.class_graph;
        log::info!(
            "Instrumenting {} program classes ({:?} mode)",
            class_graph.program_classes().len(),
            settings.instrument_type
        );

        if settings.filter_meizu_push {
            marks::mark_meizu_push(class_graph);
        }
        marks::mark_disabled(class_graph, settings.filter.as_ref());
        access::widen_access(class_graph, settings.make_virtual_methods_public)?;
        components::mark_components(class_graph, &settings.components);

        let mut report = InstrumentReport::default();
        if settings.is_full() {
            report.genesis_classes = self.build_genesis_hierarchy()?;
            components::add_missing_static_initializers(class_graph)?;
            fields::add_field_holders(class_graph)?;
        }
        fields::add_interceptor_fields(class_graph)?;

        for class in class_graph.program_classes() {
            if class.disable_intercept.get() {
                continue;
            }
            report.classes.push(self.instrument_class(class)?);
        }

        log::info!(
            "Instrumented {} methods in {} classes, created {} genesis classes",
            report
                .classes
                .iter()
                .flat_map(|class| &class.methods)
                .filter(|method| method.instrumented)
                .count(),
            report.classes.len(),
            report.genesis_classes.len()
        );
        Ok(report)
    }

    fn build_genesis_hierarchy(&self) -> Result<Vec<BinaryName>, Error> {
        log::info!("Building genesis hierarchy");
        let mut builder = GenesisBuilder::new(self.class_graph);
        for component in ComponentType::ALL {
            let root_name = match components::platform_root(component) {
                Some(root_name) => root_name,
                None => continue,
            };
            match self.class_graph.lookup_class(&root_name) {
                Some(root) => builder.visit_component(component, root)?,
                None => log::debug!("No {} in the class graph", root_name),
            }
        }
        let genesis_classes = builder.finish()?;
        Ok(genesis_classes
            .into_iter()
            .map(|class| class.name.clone())
            .collect())
    }

    fn instrument_class(&self, class: &'g ClassData<'g>) -> Result<ClassReport, Error> {
        let methods = assign_method_ids(class)?;
        let mut reports = Vec::with_capacity(methods.len());
        for method in methods {
            let method_id = method
                .method_id()
                .ok_or_else(|| Error::MissingMethodId(format!("{:?}", method)))?;
            let instrumented = self.route_method(method)?;
            let dispatch = if instrumented && !method.is_static_initializer() {
                Some(Dispatch::classify(method, &self.settings.special_parameter_shapes))
            } else {
                None
            };
            reports.push(MethodReport {
                name: method.name.clone(),
                descriptor: method.descriptor.clone(),
                method_id,
                dispatch,
                instrumented,
            });
        }
        log::debug!("Instrumented {:?}", class);
        Ok(ClassReport {
            name: class.name.clone(),
            methods: reports,
        })
    }

    /// Route one method to its instrumenter, returning whether it was rewritten
    fn route_method(&self, method: &MethodData<'g>) -> Result<bool, Error> {
        if method.disable_intercept.get() || !method.has_code() {
            log::trace!("Skipping {:?}", method);
            return Ok(false);
        }

        if method.is_static_initializer() {
            instrument_static_initializer(method)?;
        } else if method.is_constructor() {
            let form = match method.role.get() {
                ConstructorRole::Wormhole => None,
                ConstructorRole::ComponentDirect if self.settings.is_full() => {
                    Some(InitForm::DirectComponent)
                }
                ConstructorRole::ComponentDirect | ConstructorRole::Plain => {
                    Some(InitForm::Normal).filter(|_| self.settings.instrument_init_methods)
                }
            };
            match form {
                Some(form) => instrument_constructor(method, form)?,
                None => {
                    log::trace!("Leaving constructor {:?} as it is", method);
                    return Ok(false);
                }
            }
        } else {
            let dispatch = Dispatch::classify(method, &self.settings.special_parameter_shapes);
            instrument_method(method, &dispatch)?;
        }
        Ok(true)
    }
}
