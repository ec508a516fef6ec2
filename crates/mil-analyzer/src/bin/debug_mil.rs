//! Debug script to see what the analyzer produces for a source directory.
//!
//! Usage: `debug_mil [dir] [config.json]`. Without a directory a small
//! built-in sample is analyzed.

use std::path::{Path, PathBuf};

use mil_analyzer::frontend::csharp::CSharpFrontend;
use mil_analyzer::{AnalyzerConfig, MilGenerator};

const SAMPLE: &str = r#"
namespace Conference.Registration
{
    public interface ICommand {}
    public interface IEvent {}
    public interface IProcess {}
    public interface ICommandBus { void Send(ICommand command); }
    public interface ICommandHandler<T> where T : ICommand { void Handle(T command); }
    public interface IEventHandler<T> where T : IEvent { void Handle(T @event); }
    public abstract class EventSourced {}

    public class MakeSeatReservation : ICommand {}
    public class SeatsReserved : IEvent {}

    public class SeatsAvailability : EventSourced {}

    public class SeatsAvailabilityHandler : ICommandHandler<MakeSeatReservation>
    {
        public void Handle(MakeSeatReservation command) {}
    }

    public class RegistrationProcessRouter : IEventHandler<SeatsReserved>
    {
        private readonly ICommandBus bus;
        public void Handle(SeatsReserved @event)
        {
            var reservation = new MakeSeatReservation();
            bus.Send(reservation);
        }
    }

    public class RegistrationProcess : IProcess
    {
        public enum ProcessState { NotStarted, AwaitingReservationConfirmation, Completed }
        public ProcessState State { get; set; }
    }
}
"#;

fn main() {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    let config = match args.get(1) {
        Some(path) => match AnalyzerConfig::load(Path::new(path)) {
            Ok(config) => config,
            Err(e) => {
                println!("Error: {:?}", e);
                return;
            }
        },
        None => AnalyzerConfig::default(),
    };
    let generator = MilGenerator::new(config);

    let result = match args.first() {
        Some(dir) => generator.analyze_directory(Path::new(dir)),
        None => CSharpFrontend::new()
            .and_then(|mut frontend| {
                frontend.parse_sources("Sample", &[(PathBuf::from("sample.cs"), SAMPLE.to_string())])
            })
            .map(|compilation| generator.generate(&compilation)),
    };

    match result {
        Ok(Some(report)) => print!("{}", report.render()),
        Ok(None) => println!("Assembly excluded by configuration"),
        Err(e) => println!("Error: {:?}", e),
    }
}
