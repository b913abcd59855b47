//! Integration tests for instances: construction, dispatch and destruction

use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use strata_engine::{
    BaseRef, BuildDirector, BuildOptions, ClassBlueprint, ClassError, ClassHandle, Value,
};

fn animals(director: &mut BuildDirector) -> (ClassHandle, ClassHandle) {
    let animal = director
        .add_class(
            ClassBlueprint::new("Animal")
                .constructor(|this, args| {
                    let name = args.first().cloned().unwrap_or_else(|| Value::from("nameless"));
                    this.set("name", name);
                    Ok(Value::Null)
                })
                .virtual_method("speak", |_, _| Ok(Value::from("...")))
                .method("describe", |this, args| {
                    let said = this.call("speak", args)?;
                    let name = this.get("name").cloned().unwrap_or_default();
                    Ok(Value::from(format!("{} says {}", name, said)))
                })
                .constant("kingdom", "animalia"),
            [],
        )
        .unwrap();
    let dog = director
        .add_class(
            ClassBlueprint::new("Dog")
                .constructor(|this, args| {
                    let animal = this.class().bases()[0].clone();
                    animal.construct(this, args)?;
                    this.set("tricks", 0);
                    Ok(Value::Null)
                })
                .method("speak", |_, _| Ok(Value::from("Woof"))),
            [BaseRef::from(&animal)],
        )
        .unwrap();
    (animal, dog)
}

#[test]
fn test_virtual_dispatch() {
    let mut director = BuildDirector::new();
    let (animal, dog) = animals(&mut director);
    director.finalize_all().unwrap();

    let mut generic = animal.instantiate(&[Value::from("Generic")]).unwrap();
    assert_eq!(generic.call("speak", &[]).unwrap(), Value::from("..."));

    let mut rex = dog.instantiate(&[Value::from("Rex")]).unwrap();
    assert_eq!(rex.call("speak", &[]).unwrap(), Value::from("Woof"));
    // A base method calling a virtual member reaches the override.
    assert_eq!(
        rex.call("describe", &[]).unwrap(),
        Value::from("\"Rex\" says \"Woof\"")
    );
    // The base definition stays reachable explicitly.
    assert_eq!(rex.call_as(&animal, "speak", &[]).unwrap(), Value::from("..."));

    assert_eq!(rex.get("tricks"), Some(&Value::Int(0)));
    assert!(rex.is_a(&animal));
    assert!(!generic.is_a(&dog));

    rex.destroy().unwrap();
    generic.destroy().unwrap();
}

#[test]
fn test_constants_and_unknown_members() {
    let mut director = BuildDirector::new();
    let (_, dog) = animals(&mut director);
    director.finalize_all().unwrap();

    let mut rex = dog.instantiate(&[]).unwrap();
    assert_eq!(rex.call("kingdom", &[]).unwrap(), Value::from("animalia"));
    assert_eq!(rex.get("name"), Some(&Value::from("nameless")));

    let err = rex.call("fly", &[]).unwrap_err();
    assert!(matches!(
        err,
        ClassError::UnknownMember { ref class, ref member } if class == "Dog" && member == "fly"
    ));
}

#[test]
fn test_call_as_unrelated_class_fails() {
    let mut director = BuildDirector::new();
    let (animal, _) = animals(&mut director);
    let rock = director
        .add_class(ClassBlueprint::new("Rock").method("speak", |_, _| Ok(Value::Null)), [])
        .unwrap();
    director.finalize_all().unwrap();

    let mut generic = animal.instantiate(&[]).unwrap();
    assert!(matches!(
        generic.call_as(&rock, "speak", &[]).unwrap_err(),
        ClassError::Runtime(_)
    ));
}

#[test]
fn test_root_members() {
    let mut director = BuildDirector::new();
    let (animal, dog) = animals(&mut director);
    director.finalize_all().unwrap();

    let mut rex = dog.instantiate(&[Value::from("Rex")]).unwrap();
    assert_eq!(rex.call("type_name", &[]).unwrap(), Value::from("Dog"));
    assert_eq!(
        rex.call("class_id", &[]).unwrap(),
        Value::Int(dog.class_id().as_u32() as i64)
    );
    assert_eq!(rex.call("is_a", &[Value::from("Animal")]).unwrap(), Value::Bool(true));
    assert_eq!(rex.call("is_a", &[Value::from("Object")]).unwrap(), Value::Bool(true));
    assert_eq!(rex.call("is_a", &[Value::from("Cat")]).unwrap(), Value::Bool(false));
    assert!(rex.call("is_a", &[]).is_err());

    let dump = rex.call("dump", &[]).unwrap();
    let dump = dump.as_str().unwrap();
    assert!(dump.starts_with("Dog"));
    assert!(dump.contains("Rex"));

    assert!(animal.is_subclass_of(director.root().unwrap()));
}

#[test]
fn test_destructors_run_most_derived_first() {
    let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

    let mut director = BuildDirector::new();
    let tracker = |name: &'static str| {
        let log = log.clone();
        move |_: &mut strata_engine::Instance, _: &[Value]| -> strata_engine::ClassResult<Value> {
            log.lock().push(name);
            Ok(Value::Null)
        }
    };

    let root = director
        .add_class(ClassBlueprint::new("Root").destructor(tracker("Root")), [])
        .unwrap();
    // Mid has no destructor of its own; it is skipped.
    let mid = director
        .add_class(ClassBlueprint::new("Mid"), [BaseRef::from(&root)])
        .unwrap();
    let leaf = director
        .add_class(
            ClassBlueprint::new("Leaf").destructor(tracker("Leaf")),
            [BaseRef::from(&mid)],
        )
        .unwrap();
    director.finalize_all().unwrap();

    leaf.instantiate(&[]).unwrap().destroy().unwrap();
    assert_eq!(*log.lock(), vec!["Leaf", "Root"]);

    log.lock().clear();
    mid.instantiate(&[]).unwrap().destroy().unwrap();
    assert_eq!(*log.lock(), vec!["Root"]);
}

#[test]
fn test_three_level_destructor_chain() {
    let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
    let mut director = BuildDirector::new();

    let mut parent: Option<ClassHandle> = None;
    for name in ["Root", "Mid", "Leaf"] {
        let log = log.clone();
        let blueprint = ClassBlueprint::new(name).destructor(move |_, _| {
            log.lock().push(name);
            Ok(Value::Null)
        });
        let bases: Vec<BaseRef> = parent.iter().map(BaseRef::from).collect();
        parent = Some(director.add_class(blueprint, bases).unwrap());
    }
    director.finalize_all().unwrap();

    let leaf = parent.unwrap();
    leaf.instantiate(&[]).unwrap().destroy().unwrap();
    assert_eq!(*log.lock(), vec!["Leaf", "Mid", "Root"]);
}

#[test]
fn test_destroy_through_base_runs_full_chain() {
    let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
    let mut director = BuildDirector::new();

    let mut parent: Option<ClassHandle> = None;
    let mut classes = Vec::new();
    for name in ["Base", "Der"] {
        let log = log.clone();
        let blueprint = ClassBlueprint::new(name).destructor(move |_, _| {
            log.lock().push(name);
            Ok(Value::Null)
        });
        let bases: Vec<BaseRef> = parent.iter().map(BaseRef::from).collect();
        let class = director.add_class(blueprint, bases).unwrap();
        classes.push(class.clone());
        parent = Some(class);
    }
    director.finalize_all().unwrap();

    let (base, der) = (&classes[0], &classes[1]);
    base.destroy(der.instantiate(&[]).unwrap()).unwrap();
    assert_eq!(*log.lock(), vec!["Der", "Base"]);
}

#[test]
fn test_destructor_chain_over_diamond() {
    let log: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let mut director = BuildDirector::new();

    let mut handles: Vec<ClassHandle> = Vec::new();
    for (name, bases) in [("A", vec![]), ("B", vec![0]), ("C", vec![0]), ("D", vec![1, 2])] {
        let log = log.clone();
        let bases: Vec<BaseRef> = bases.into_iter().map(|i: usize| BaseRef::from(&handles[i])).collect();
        let class = director
            .add_class(
                ClassBlueprint::new(name).destructor(move |_, _| {
                    log.lock().push(name.to_string());
                    Ok(Value::Null)
                }),
                bases,
            )
            .unwrap();
        handles.push(class);
    }
    director.finalize_all().unwrap();

    handles[3].instantiate(&[]).unwrap().destroy().unwrap();
    // The shared base runs once.
    assert_eq!(*log.lock(), vec!["D", "C", "B", "A"]);
}

#[test]
fn test_constructor_must_not_return_value() {
    let mut director = BuildDirector::new();
    let bad = director
        .add_class(
            ClassBlueprint::new("Bad").constructor(|_, _| Ok(Value::Int(5))),
            [],
        )
        .unwrap();
    director.finalize_all().unwrap();

    let err = bad.instantiate(&[]).unwrap_err();
    assert!(matches!(
        err,
        ClassError::ConstructorReturnedValue { ref class, ref value } if class == "Bad" && value == "5"
    ));
}

#[test]
fn test_constructor_errors_propagate() {
    let mut director = BuildDirector::new();
    let picky = director
        .add_class(
            ClassBlueprint::new("Picky").constructor(|_, args| {
                if args.is_empty() {
                    return Err(ClassError::Runtime("argument required".to_string()));
                }
                Ok(Value::Null)
            }),
            [],
        )
        .unwrap();
    director.finalize_all().unwrap();

    assert!(matches!(picky.instantiate(&[]).unwrap_err(), ClassError::Runtime(_)));
    assert!(picky.instantiate(&[Value::Bool(true)]).is_ok());
}

#[test]
fn test_construct_rejects_foreign_instance() {
    let mut director = BuildDirector::new();
    let (animal, _) = animals(&mut director);
    let rock = director.add_class(ClassBlueprint::new("Rock"), []).unwrap();
    director.finalize_all().unwrap();

    let mut stone = rock.instantiate(&[]).unwrap();
    let err = animal.construct(&mut stone, &[]).unwrap_err();
    assert!(matches!(
        err,
        ClassError::ForeignConstructorSelf { ref class, ref instance_class }
            if class == "Animal" && instance_class == "Rock"
    ));

    let err = animal.destroy(stone).unwrap_err();
    assert!(matches!(err, ClassError::ForeignConstructorSelf { .. }));
}

#[test]
fn test_self_validation_can_be_disabled() {
    let options = BuildOptions {
        validate_constructor_self: false,
        ..BuildOptions::default()
    };
    let mut director = BuildDirector::with_options(options).unwrap();
    let (animal, _) = animals(&mut director);
    let rock = director.add_class(ClassBlueprint::new("Rock"), []).unwrap();
    director.finalize_all().unwrap();

    let mut stone = rock.instantiate(&[]).unwrap();
    animal.construct(&mut stone, &[Value::from("Pebble")]).unwrap();
    assert_eq!(stone.get("name"), Some(&Value::from("Pebble")));
}

#[test]
fn test_shared_director_registration_across_threads() {
    let shared = BuildDirector::new().into_shared();
    let base = shared
        .lock()
        .add_class(ClassBlueprint::new("Base").virtual_method("id", |_, _| Ok(Value::Int(0))), [])
        .unwrap();

    let workers: Vec<_> = (0..4)
        .map(|i| {
            let shared = shared.clone();
            let base = base.clone();
            thread::spawn(move || {
                let class = ClassBlueprint::new(format!("Worker{}", i))
                    .method("id", move |_, _| Ok(Value::Int(i)));
                shared.lock().add_class(class, [BaseRef::from(base)]).unwrap()
            })
        })
        .collect();
    let classes: Vec<ClassHandle> = workers.into_iter().map(|w| w.join().unwrap()).collect();

    shared.lock().finalize_all().unwrap();
    assert_eq!(base.derived().len(), 4);

    // Finalized classes are safe to use from any thread.
    let readers: Vec<_> = classes
        .into_iter()
        .map(|class| {
            thread::spawn(move || class.instantiate(&[]).unwrap().call("id", &[]).unwrap())
        })
        .collect();
    let results: Vec<Value> = readers.into_iter().map(|r| r.join().unwrap()).collect();
    assert_eq!(results.len(), 4);
    for i in 0..4 {
        assert!(results.contains(&Value::Int(i)));
    }
}
