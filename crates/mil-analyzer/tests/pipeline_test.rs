use std::path::PathBuf;

use mil_analyzer::frontend::csharp::CSharpFrontend;
use mil_analyzer::mil::{render, LINE_TERMINATOR as NL, EMPTY, STATEMENT_TERMINATOR, STATE_DEFINITION};
use mil_analyzer::report::{COMMANDS, EVENTS, MESSAGE_PUBLICATIONS, PROCESSES, PUBLICATION_SITES};
use mil_analyzer::{
    AnalysisError, AnalyzerConfig, Compilation, MilGenerator, MilToken, ProcessAnalyzer, SemanticAnalyzer,
    SyntaxWalker,
};

const MESSAGES: &str = r#"
namespace Shop.Messages
{
    using System.Collections.Generic;

    public interface ICommandBus { void Send(ICommand cmd); void Send(IEnumerable<ICommand> cmds); }
    public interface ICommand {}
    public interface IEvent {}
    public interface IProcess {}
    public interface ICommandHandler<T> where T : ICommand { void Handles(T cmd); }
    public interface IEventHandler<T> where T : IEvent { void Handles(T evt); }

    public class PlaceOrder : ICommand {}
    public class OrderPlaced : IEvent {}

    public class FulfillmentProcess : IProcess, ICommandHandler<PlaceOrder>, IEventHandler<OrderPlaced>
    {
        public enum FulfillmentState { Pending = 0, Packing = 1, Shipped = 2 }

        public FulfillmentState State { get; set; }
        public FulfillmentProcess() { State = FulfillmentState.Packing; }
        public void Handles(PlaceOrder cmd) {}
        public void Handles(OrderPlaced evt) {}
    }
}
"#;

const WEB: &str = r#"
namespace Shop.Web
{
    using System;
    using Shop.Messages;

    public class Storefront
    {
        private readonly ICommandBus commandBus;

        public Storefront(ICommandBus bus) { commandBus = bus; }

        public string Checkout(PlaceOrder cmd)
        {
            commandBus.Send(cmd);
            return "ok";
        }
    }

    public class Program
    {
        public static void Main()
        {
            var front = new Storefront(null);
            var order = new PlaceOrder();
            front.Checkout(order);
        }
    }
}
"#;

fn compile(assembly: &str, sources: &[(&str, &str)]) -> Compilation {
    let sources: Vec<(PathBuf, String)> = sources
        .iter()
        .map(|(path, source)| (PathBuf::from(path), source.to_string()))
        .collect();
    CSharpFrontend::new()
        .unwrap()
        .parse_sources(assembly, &sources)
        .unwrap()
}

fn shop() -> Compilation {
    compile("Shop", &[("Messages.cs", MESSAGES), ("Web.cs", WEB)])
}

#[test]
fn shop_compilation_is_valid() {
    let compilation = shop();
    assert!(
        compilation.declaration_diagnostics().is_empty(),
        "{:?}",
        compilation.declaration_diagnostics()
    );
}

#[test]
fn publication_is_correlated_across_files() {
    let compilation = shop();
    let analyzer = SemanticAnalyzer::new(&compilation).unwrap();

    let tokens: Vec<MilToken> = analyzer.get_message_publication_data().collect();
    assert_eq!(render(&tokens), format!("PlaceOrder? -> FulfillmentProcess{}", NL));
}

#[test]
fn walker_dumps_commands_and_events() {
    let compilation = shop();
    let mut walker = SyntaxWalker::default();
    for unit in compilation.units() {
        walker.visit(unit);
    }

    assert_eq!(
        render(&walker.dump_command_data().collect::<Vec<_>>()),
        format!("PlaceOrder? -> FulfillmentProcess{}", NL)
    );
    assert_eq!(
        render(&walker.dump_event_data().collect::<Vec<_>>()),
        format!("OrderPlaced! -> {nl}\t -> FulfillmentProcess{nl}{nl}", nl = NL)
    );

    let sites: Vec<String> = walker.dump_publication_data().collect();
    assert_eq!(sites.len(), 1);
    assert!(sites[0].starts_with("Shop.Web.Storefront.Checkout:["), "{}", sites[0]);
}

#[test]
fn process_states_are_discovered() {
    let compilation = shop();
    let analyzer = ProcessAnalyzer::default();

    let states = analyzer.get_process_state_names(&compilation, "Fulfillment").unwrap();
    assert_eq!(states, vec!["Pending", "Packing", "Shipped"]);

    let token = analyzer.get_process_token(&compilation, "Fulfillment");
    assert!(token.is(&STATE_DEFINITION));
    assert_eq!(token.to_string(), "%FulfillmentProcess, State:[Pending, Packing, Shipped]");
}

#[test]
fn missing_process_yields_empty_token() {
    let compilation = compile("Plain", &[("a.cs", "namespace N { class A {} }")]);
    let token = ProcessAnalyzer::default().get_process_token(&compilation, "");
    assert!(token.is(&EMPTY));
    assert!(!token.is(&STATEMENT_TERMINATOR));
}

#[test]
fn generator_renders_every_section() {
    let compilation = shop();
    let report = MilGenerator::new(AnalyzerConfig::default())
        .generate(&compilation)
        .unwrap();

    assert_eq!(
        report.section(COMMANDS).unwrap().body,
        format!("PlaceOrder? -> FulfillmentProcess{}", NL)
    );
    assert_eq!(
        report.section(MESSAGE_PUBLICATIONS).unwrap().body,
        format!("PlaceOrder? -> FulfillmentProcess{}", NL)
    );
    assert_eq!(
        report.section(PROCESSES).unwrap().body,
        format!("%FulfillmentProcess, State:[Pending, Packing, Shipped]{}", NL)
    );
    assert!(!report.section(EVENTS).unwrap().is_empty());
    assert!(!report.section(PUBLICATION_SITES).unwrap().is_empty());
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);

    let text = report.render();
    assert!(text.starts_with(&format!("# Shop{}", NL)));
    assert!(text.contains(&format!("== Aggregate Roots =={nl}-- none --{nl}", nl = NL)));
}

#[test]
fn invalid_compilation_enumerates_diagnostics() {
    let compilation = compile(
        "Broken",
        &[("a.cs", "namespace N { class A : IMissing {} class B : IAlsoMissing {} }")],
    );

    match SemanticAnalyzer::new(&compilation) {
        Err(AnalysisError::InvalidCompilation { count, details, .. }) => {
            assert_eq!(count, 2);
            assert!(details.contains("IMissing"));
            assert!(details.contains("IAlsoMissing"));
        }
        other => panic!("expected validation failure, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn directory_is_parsed_as_one_assembly() {
    let dir = tempfile::TempDir::new().unwrap();
    let root = dir.path().join("Shop");
    std::fs::create_dir_all(root.join("Web")).unwrap();
    std::fs::create_dir_all(root.join("obj")).unwrap();

    std::fs::write(root.join("Messages.cs"), MESSAGES).unwrap();
    std::fs::write(root.join("Web").join("Storefront.cs"), WEB).unwrap();
    std::fs::write(root.join("obj").join("Generated.cs"), "namespace Junk { class Broken : Nope {} }").unwrap();
    std::fs::write(root.join("README.md"), "not C#").unwrap();

    let report = MilGenerator::new(AnalyzerConfig::default())
        .analyze_directory(&root)
        .unwrap()
        .unwrap();

    assert_eq!(report.assembly, "Shop");
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    assert_eq!(
        report.section(MESSAGE_PUBLICATIONS).unwrap().body,
        format!("PlaceOrder? -> FulfillmentProcess{}", NL)
    );
}

#[test]
fn excluded_directory_produces_no_report() {
    let dir = tempfile::TempDir::new().unwrap();
    let root = dir.path().join("Shop.Web.Public");
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(root.join("a.cs"), "namespace N { class A {} }").unwrap();

    let config = AnalyzerConfig::from_json(r#"{ "excludedAssemblies": ["Shop.Web.Public"] }"#).unwrap();
    let report = MilGenerator::new(config).analyze_directory(&root).unwrap();
    assert!(report.is_none());
}

#[test]
fn unsupported_language_is_rejected() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = AnalyzerConfig {
        language: "fsharp".to_string(),
        ..AnalyzerConfig::default()
    };
    let err = MilGenerator::new(config).analyze_directory(dir.path()).unwrap_err();
    assert!(matches!(err, AnalysisError::UnsupportedLanguage { .. }));
}
