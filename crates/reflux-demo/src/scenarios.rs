//! End-to-end scenarios printed by the demo.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use reflux_core::{
    CalculationError, CancellationToken, PropertyChangedNotifier, PropertyFactory, ReadableProperty,
    SchedulerRole, Subscription, VirtualScheduler,
};
use tracing::info;

/// Print every emission of `name`'s stream as it happens.
fn print_emissions<T: std::fmt::Debug + Send + Sync + 'static>(
    name: &'static str,
    observable: &reflux_core::Observable<T>,
) -> Subscription {
    observable.subscribe(move |value| println!("  {name}: {value:?}"))
}

/// First name, last name and a synchronous full name.
pub fn full_name(factory: &PropertyFactory) -> Result<()> {
    println!("full name");
    let first = factory.mutable("John".to_string());
    let last = factory.mutable("Smith".to_string());
    let full = factory
        .calculate((first.clone(), last.clone()))
        .label("full_name")
        .synchronous(|(first, last)| Ok(format!("{first} {last}")));

    let notifier = PropertyChangedNotifier::new();
    notifier.track("FullName", &full);
    let _events = notifier
        .on_property_changed()
        .subscribe(|event| println!("  property changed: {}", event.property_name));
    let _values = print_emissions("on_successful_value_changed", &full.on_successful_value_changed());

    last.set_value("Davis".to_string());
    if full.value() != "John Davis" {
        bail!("unexpected full name {:?}", full.value());
    }
    info!(value = %full.value(), "full name recalculated");
    Ok(())
}

/// A burst of emissions against the configured throttle, replayed on a
/// virtual clock. Falls back to a 100 ms window when none is configured.
pub fn throttle(factory: &PropertyFactory) -> Result<()> {
    println!("throttle");
    let configured = factory.config().default_throttle();
    let window = if configured.is_zero() {
        Duration::from_millis(100)
    } else {
        configured
    };
    let clock = Arc::new(VirtualScheduler::new());
    let factory = PropertyFactory::new(
        factory
            .config()
            .clone()
            .with_scheduler(clock.clone())
            .with_default_throttle(window),
    );
    let input = factory.mutable(0);
    let squared = factory.throttled((input.clone(),), SchedulerRole::Interactive, |(v,)| {
        println!("  calculating with {v}");
        Ok(v * v)
    });
    let _flags = print_emissions("is_calculating", &squared.on_is_calculating_changed());

    // Gaps of half and seven tenths of the window keep the burst inside it.
    for (at, value) in [(window / 2, 1), (window * 6 / 5, 2)] {
        clock.advance_to(at);
        input.set_value(value);
    }
    let ran = clock.advance_by(window);
    println!("  t={:?}: {ran} recomputation(s), value {}", clock.now(), squared.value());
    if ran != 1 || squared.value() != 4 {
        bail!("throttle ran {ran} times with value {}", squared.value());
    }
    Ok(())
}

/// A slow calculation superseded by a newer input.
pub async fn cancel(factory: &PropertyFactory) -> Result<()> {
    println!("cancel");
    let input = factory.mutable(1u64);
    let slow = factory
        .calculate((input.clone(),))
        .label("slow_double")
        .cancelable(Duration::ZERO, SchedulerRole::LongRunning, |(v,), signal| async move {
            for _ in 0..v * 10 {
                tokio::time::sleep(Duration::from_millis(10)).await;
                signal.check()?;
            }
            Ok::<_, CalculationError>(v * 2)
        });
    let _values = print_emissions("on_successful_value_changed", &slow.on_successful_value_changed());

    tokio::time::sleep(Duration::from_millis(30)).await;
    input.set_value(3);
    tokio::time::sleep(Duration::from_millis(30)).await;
    input.set_value(2);

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while slow.is_calculating() {
        if tokio::time::Instant::now() > deadline {
            bail!("cancelable calculation did not finish");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    if slow.value() != 4 {
        bail!("expected 4, got {}", slow.value());
    }
    Ok(())
}

/// A calculation failing for some inputs.
pub fn errors(factory: &PropertyFactory) -> Result<()> {
    println!("errors");
    let text = factory.mutable("12".to_string());
    let parsed = factory.calculated((text.clone(),), |(text,)| Ok(text.trim().parse::<i32>()?));
    let _errors = print_emissions("on_calculation_error", &parsed.on_calculation_error());

    text.set_value("twelve".to_string());
    println!("  value or default: {}", parsed.value());
    match parsed.successful_value_or_throw() {
        Ok(value) => bail!("expected a failure, got {value}"),
        Err(error) => println!("  or throw: {error}"),
    }
    text.set_value("13".to_string());
    println!("  recovered: {:?}", parsed.successful_value_or_throw());
    Ok(())
}
