use std::{
    process::ExitCode,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread,
};

use listpoint::{
    init_logging, EndpointDirectory, EndpointEvent, EndpointListener, EndpointSettings,
    ListpointResult, LoggingConfig, Message, StatusCode,
};

/// Печатает переходы состояния endpoint'а.
struct PrintListener;

impl EndpointListener for PrintListener {
    fn on_event(
        &self,
        event: &EndpointEvent,
    ) {
        println!("  [event] {} on '{}'", event.kind(), event.endpoint());
    }

    fn name(&self) -> &str {
        "print"
    }
}

fn main() -> ExitCode {
    if let Err(e) = init_logging(LoggingConfig::default()) {
        eprintln!("Failed to initialize logging: {e}");
    }

    match run() {
        Ok(()) => {
            println!("\n=== All demos completed successfully! ===");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("demo failed: {e:?}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> ListpointResult<()> {
    println!("=== Listpoint tap pipeline ===\n");

    let settings = EndpointSettings::load()?;
    let directory = EndpointDirectory::with_settings(settings);

    demo_1_record_and_broadcast(&directory)?;
    demo_2_concurrent_producers(&directory)?;
    demo_3_lifecycle(&directory)?;

    directory.stop_all();
    Ok(())
}

/// Демо 1: запись в журнал и рассылка двум потребителям
fn demo_1_record_and_broadcast(directory: &EndpointDirectory) -> ListpointResult<()> {
    println!("Demo 1: record and broadcast");
    println!("----------------------------");

    let endpoint = directory.resolve("orders")?;
    endpoint.add_listener(Arc::new(PrintListener));
    endpoint.start();

    let audit = endpoint.create_consumer(|msg: &Message| -> ListpointResult<()> {
        println!("  audit   <- {}", String::from_utf8_lossy(msg.payload()));
        Ok(())
    });
    let billing = endpoint.create_consumer(|msg: &Message| -> ListpointResult<()> {
        println!("  billing <- {}", String::from_utf8_lossy(msg.payload()));
        Ok(())
    });
    audit.start();
    billing.start();

    let producer = endpoint.create_producer();
    for body in ["order-1", "order-2", "order-3"] {
        producer.send(Message::new(body).with_header("source", "demo"))?;
    }

    println!(
        "Snapshot ({} entries, strategy {}):",
        endpoint.log_len(),
        endpoint.strategy_name()
    );
    for msg in endpoint.snapshot() {
        println!("  {} {}", msg.id(), String::from_utf8_lossy(msg.payload()));
    }
    println!();
    Ok(())
}

/// Демо 2: несколько потоков-продюсеров пишут в один endpoint
fn demo_2_concurrent_producers(directory: &EndpointDirectory) -> ListpointResult<()> {
    println!("Demo 2: concurrent producers");
    println!("----------------------------");

    const THREADS: usize = 4;
    const PER_THREAD: usize = 250;

    let endpoint = directory.resolve("metrics")?;
    endpoint.start();
    let received = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&received);
    let consumer = endpoint.create_consumer(move |_: &Message| -> ListpointResult<()> {
        counter.fetch_add(1, Ordering::Relaxed);
        Ok(())
    });
    consumer.start();

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let producer = endpoint.create_producer();
            thread::spawn(move || -> ListpointResult<()> {
                for i in 0..PER_THREAD {
                    producer.send(Message::new(format!("t{t}-{i}")))?;
                }
                Ok(())
            })
        })
        .collect();
    for handle in handles {
        match handle.join() {
            Ok(result) => result?,
            Err(_) => listpoint::bail!(StatusCode::Internal, "producer thread panicked"),
        }
    }

    let stats = endpoint.stats().snapshot();
    println!(
        "Logged {} messages, consumer saw {}, accepted {}\n",
        endpoint.log_len(),
        received.load(Ordering::Relaxed),
        stats.sends_accepted
    );
    Ok(())
}

/// Демо 3: после stop журнал очищен, отправка отклоняется
fn demo_3_lifecycle(directory: &EndpointDirectory) -> ListpointResult<()> {
    println!("Demo 3: lifecycle");
    println!("-----------------");

    let endpoint = directory.resolve("orders")?;
    let discarded = endpoint.stop();
    println!("Stopped, discarded {discarded} messages");

    match endpoint.create_producer().send(Message::new("late")) {
        Ok(()) => println!("unexpected: send accepted while stopped"),
        Err(e) => println!("Send rejected: {} [{}]", e.client_message(), e.status_code()),
    }

    endpoint.start();
    println!("Restarted, snapshot has {} entries", endpoint.snapshot().len());
    Ok(())
}
