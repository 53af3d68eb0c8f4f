use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use sqlx::PgPool;
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::{RotationCoordinator, TokenCodec, TokenStore};
use crate::logger::LoggerMiddleware;
use crate::routes::{
    delete_author, delete_book, delete_book_author, delete_user, health_check, json_error_handler,
    list_authors, list_book_authors, list_books, list_users, login, register_author, register_book,
    register_book_author, register_user, update_author, update_book, update_book_author, update_user,
};

/// Build the HTTP server over an already bound listener.
///
/// `store` is the token ledger every worker shares; catalog queries go
/// through `connection`.
pub fn run(
    listener: TcpListener,
    connection: PgPool,
    store: Arc<dyn TokenStore>,
    codec: TokenCodec,
) -> Result<Server, std::io::Error> {
    let connection = web::Data::new(connection);
    let coordinator = web::Data::new(RotationCoordinator::new(codec, store));

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware
            .wrap(Logger::default())
            .wrap(LoggerMiddleware)

            // Shared state
            .app_data(connection.clone())
            .app_data(coordinator.clone())
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))

            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/user")
                    .route("/register", web::post().to(register_user))
                    .route("/auth", web::post().to(login))
                    .route("/show", web::get().to(list_users))
                    .route("/update", web::put().to(update_user))
                    .route("/delete", web::delete().to(delete_user)),
            )
            .service(
                web::scope("/author")
                    .route("/register", web::post().to(register_author))
                    .route("/show", web::get().to(list_authors))
                    .route("/update", web::put().to(update_author))
                    .route("/delete", web::delete().to(delete_author)),
            )
            .service(
                web::scope("/book_author")
                    .route("/register", web::post().to(register_book_author))
                    .route("/show", web::get().to(list_book_authors))
                    .route("/update", web::put().to(update_book_author))
                    .route("/delete", web::delete().to(delete_book_author)),
            )
            .service(
                web::scope("/book")
                    .route("/register", web::post().to(register_book))
                    .route("/show", web::get().to(list_books))
                    .route("/update", web::put().to(update_book))
                    .route("/delete", web::delete().to(delete_book)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
