//! End-to-end behavior of synchronous calculated properties.
#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use reflux_core::{MutableProperty, PropertyFactory, ReadableProperty, ValueOrError};
use reflux_testkit::{init_tracing, Person, Recorder};

#[test]
fn full_name_follows_last_name() {
    init_tracing();
    let person = Person::john_smith();
    assert_eq!(person.full_name.value(), "John Smith");

    let successes = Recorder::attach(&person.full_name.on_successful_value_changed());
    assert_eq!(successes.take(), vec!["John Smith".to_string()]);

    person.last_name.set_value("Davis".to_string());
    assert_eq!(person.full_name.value(), "John Davis");
    assert_eq!(successes.values(), vec!["John Davis".to_string()]);
}

#[test]
fn setting_an_equal_upstream_value_does_not_recompute() {
    let person = Person::john_smith();
    let sets = Recorder::attach(&person.full_name.on_value_or_error_set());

    person.first_name.set_value("John".to_string());
    assert_eq!(sets.len(), 1);

    person.first_name.set_value("Jane".to_string());
    assert_eq!(
        sets.values(),
        vec![
            ValueOrError::Value("John Smith".to_string()),
            ValueOrError::Value("Jane Smith".to_string()),
        ]
    );
}

#[test]
fn on_changed_skips_equal_recomputations_while_on_set_does_not() {
    let factory = PropertyFactory::default();
    let number = factory.mutable(1);
    let parity = factory.calculated((number.clone(),), |(n,)| Ok(n % 2));

    let changed = Recorder::attach(&parity.on_changed());
    let set = Recorder::attach(&parity.on_set());
    for n in [3, 5, 6, 8, 9] {
        number.set_value(n);
    }

    assert_eq!(changed.values(), vec![1, 0, 1]);
    assert_eq!(set.values(), vec![1, 1, 1, 0, 0, 1]);
    assert!(!changed.has_consecutive_duplicates());
}

#[test]
fn every_stream_replays_the_current_state_on_subscribe() {
    let person = Person::john_smith();
    person.last_name.set_value("Davis".to_string());

    assert_eq!(
        Recorder::attach(&person.full_name.on_changed()).values(),
        vec!["John Davis".to_string()]
    );
    assert_eq!(
        Recorder::attach(&person.full_name.on_set()).values(),
        vec!["John Davis".to_string()]
    );
    assert_eq!(
        Recorder::attach(&person.full_name.on_value_or_error_changed()).len(),
        1
    );
    assert_eq!(
        Recorder::attach(&person.full_name.on_is_calculating_changed()).values(),
        vec![false]
    );
    assert_eq!(
        Recorder::attach(&person.last_name.on_set()).values(),
        vec!["Davis".to_string()]
    );
}

#[test]
fn calculated_properties_compose_into_a_dag() {
    let factory = PropertyFactory::default();
    let a = factory.mutable(1);
    let b = factory.mutable(2);
    let sum = factory.calculated((a.clone(), b.clone()), |(a, b)| Ok(a + b));
    let product = factory.calculated((a.clone(), b.clone()), |(a, b)| Ok(a * b));
    let report = factory.calculated((sum.clone(), product.clone()), |(s, p)| {
        Ok(format!("sum={s} product={p}"))
    });

    assert_eq!(report.value(), "sum=3 product=2");
    b.set_value(5);
    assert_eq!(report.value(), "sum=6 product=5");
}

#[test]
fn intermediate_properties_handed_over_by_value_stay_wired() {
    let factory = PropertyFactory::default();
    let x = factory.mutable(1);
    let doubled = factory.calculated((x.clone(),), |(v,)| Ok(v * 2));
    let plus_one = factory.calculated((doubled,), |(v,)| Ok(v + 1));
    let seen = Recorder::attach(&plus_one.on_changed());

    x.set_value(10);
    assert_eq!(plus_one.value(), 21);
    assert_eq!(seen.values(), vec![3, 21]);
    assert!(!plus_one.is_disposed());
}

#[test]
fn vec_sources_combine_any_number_of_inputs() {
    let factory = PropertyFactory::default();
    let inputs: Vec<MutableProperty<i32>> = (1..=6).map(|n| factory.mutable(n)).collect();
    let total = factory.calculated(inputs.clone(), |values: Vec<i32>| Ok(values.iter().sum::<i32>()));

    assert_eq!(total.value(), 21);
    inputs[5].set_value(0);
    assert_eq!(total.value(), 15);

    let empty = factory.calculated(Vec::<MutableProperty<i32>>::new(), |values: Vec<i32>| {
        Ok(values.len())
    });
    assert_eq!(empty.value(), 0);
    assert!(!empty.is_calculating());
}

#[test]
fn dispose_stops_recomputation_and_is_idempotent() {
    let person = Person::john_smith();
    let values = Recorder::attach(&person.full_name.on_set());

    person.full_name.dispose();
    person.full_name.dispose();
    assert!(person.full_name.is_disposed());

    person.last_name.set_value("Davis".to_string());
    assert_eq!(person.full_name.value(), "John Smith");
    assert_eq!(values.values(), vec!["John Smith".to_string()]);
    assert!(Recorder::attach(&person.full_name.on_set()).is_empty());
}

#[test]
fn a_subscriber_may_write_upstream_from_inside_a_callback() {
    let factory = PropertyFactory::default();
    let celsius = factory.mutable(0);
    let doubled = factory.calculated((celsius.clone(),), |(c,)| Ok(c * 2));

    let writer = celsius.clone();
    let _clamp = doubled.on_changed().subscribe(move |value| {
        if *value > 100 {
            writer.set_value(50);
        }
    });

    celsius.set_value(80);
    assert_eq!(celsius.value(), 50);
    assert_eq!(doubled.value(), 100);
}

#[test]
fn generic_subscribe_is_on_changed() {
    let number = MutableProperty::new(1);
    let seen = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink = std::sync::Arc::clone(&seen);
    let _sub = number.subscribe(move |v| sink.lock().push(*v));

    number.set_value(1);
    number.set_value(2);
    assert_eq!(*seen.lock(), vec![1, 2]);
}
