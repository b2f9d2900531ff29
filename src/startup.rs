use std::net::TcpListener;

use actix_web::{
    dev::Server,
    middleware::Logger,
    web::{self, Data},
    App, HttpServer,
};

use crate::{
    configuration::Settings,
    routes::{default_route, scrape_route},
};

pub fn run(listener: TcpListener, settings: Settings) -> Result<Server, std::io::Error> {
    let settings = Data::new(settings);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .service(default_route::default)
            .service(web::scope("/scrape").service(scrape_route::scrape_jobs))
            .app_data(settings.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
