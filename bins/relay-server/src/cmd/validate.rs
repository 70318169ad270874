use crate::config::{Effective, ServeArgs, TransportConfig};
use crate::error::ServerError;

/// Resolve config, load the schema and run the encode probe without
/// touching the network.
pub fn run(args: ServeArgs) -> Result<(), ServerError> {
    let eff = Effective::new(&args)?;
    let encoders = super::build_encoders(&eff)?;

    println!("config      : {}", args.config);
    println!("node id     : {}", eff.node_id);
    println!("listen      : {}", eff.listen);
    println!("topic       : {}", eff.topic);
    println!("schema      : {} ({})", encoders.schema().full_name(), eff.schema.path.display());
    match eff.schema.schema_version_id {
        Some(id) => println!("framing     : glue, schema version {id}"),
        None => println!("framing     : plain avro"),
    }
    match &eff.transport {
        TransportConfig::Kafka(kafka) => {
            println!("transport   : kafka {} ({:?})", kafka.brokers.join(","), kafka.compression)
        }
        TransportConfig::Memory { partitions, max_records } => {
            println!("transport   : memory, {partitions} partition(s), keeps {max_records}")
        }
    }
    println!("ok");
    Ok(())
}
