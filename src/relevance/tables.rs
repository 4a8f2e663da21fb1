//! Built-in relevance tables.
//!
//! `TAG_CANDIDATES` maps a unit-of-work tag to the frameworks that usually
//! implement that concern. `FRAMEWORK_KEYWORDS` maps a framework (or the
//! scope of a scoped package, e.g. `prisma` for `@prisma/client`) to terms
//! whose presence in a story's text suggests the framework is involved.
//! All entries are lowercase.

pub(super) const TAG_CANDIDATES: &[(&str, &[&str])] = &[
    (
        "ui",
        &[
            "react", "react-dom", "next", "vue", "nuxt", "svelte", "@sveltejs/kit", "@angular/core",
            "solid-js", "preact", "tailwindcss", "@mui/material", "@chakra-ui/react",
        ],
    ),
    ("frontend", &["react", "next", "vue", "nuxt", "svelte", "@angular/core", "solid-js", "vite"]),
    ("component", &["react", "vue", "svelte", "@angular/core", "solid-js", "preact"]),
    ("styling", &["tailwindcss", "styled-components", "@emotion/react", "sass"]),
    ("css", &["tailwindcss", "styled-components", "@emotion/react", "sass", "postcss"]),
    (
        "database",
        &[
            "prisma", "@prisma/client", "drizzle-orm", "typeorm", "sequelize", "mongoose", "knex",
            "sqlalchemy", "psycopg2", "diesel", "sqlx", "sea-orm", "activerecord", "gorm.io/gorm",
        ],
    ),
    ("orm", &["prisma", "@prisma/client", "drizzle-orm", "typeorm", "sequelize", "sqlalchemy", "diesel", "sea-orm", "gorm.io/gorm"]),
    ("migration", &["prisma", "drizzle-kit", "alembic", "diesel", "sqlx", "activerecord"]),
    (
        "api",
        &[
            "express", "fastify", "hono", "@nestjs/core", "next", "fastapi", "flask", "django",
            "axum", "actix-web", "rocket", "rails", "sinatra", "github.com/gin-gonic/gin",
            "github.com/labstack/echo/v4", "github.com/gofiber/fiber/v2",
        ],
    ),
    (
        "backend",
        &[
            "express", "fastify", "hono", "@nestjs/core", "fastapi", "flask", "django", "axum",
            "actix-web", "rails", "github.com/gin-gonic/gin",
        ],
    ),
    ("auth", &["next-auth", "@auth/core", "passport", "lucia", "devise", "django-allauth", "jsonwebtoken"]),
    ("testing", &["jest", "vitest", "@playwright/test", "cypress", "pytest", "rspec", "mockito"]),
    ("state", &["redux", "@reduxjs/toolkit", "zustand", "jotai", "mobx", "pinia"]),
    ("forms", &["react-hook-form", "formik", "zod", "yup"]),
    ("validation", &["zod", "yup", "joi", "pydantic", "validator"]),
    ("data-fetching", &["@tanstack/react-query", "swr", "axios", "@apollo/client", "@trpc/server"]),
    ("graphql", &["graphql", "@apollo/client", "@apollo/server", "graphene", "async-graphql", "juniper"]),
    ("realtime", &["socket.io", "ws", "tokio-tungstenite", "channels"]),
    ("cli", &["clap", "commander", "yargs", "click", "typer", "github.com/spf13/cobra", "thor"]),
    ("async", &["tokio", "async-std", "asyncio", "trio"]),
    ("http", &["reqwest", "axios", "requests", "httpx", "faraday", "hyper"]),
    ("serialization", &["serde", "serde_json", "pydantic", "marshmallow"]),
    ("payments", &["stripe", "@stripe/stripe-js"]),
    ("email", &["nodemailer", "resend", "lettre", "actionmailer"]),
];

pub(super) const FRAMEWORK_KEYWORDS: &[(&str, &[&str])] = &[
    ("react", &["react", "jsx", "tsx", "usestate", "useeffect", "hook", "props"]),
    ("next", &["next.js", "nextjs", "app router", "server component", "server action", "route handler", "getserversideprops"]),
    ("vue", &["vue", "composition api", "v-model", "pinia"]),
    ("nuxt", &["nuxt"]),
    ("svelte", &["svelte", "sveltekit"]),
    ("sveltejs", &["svelte", "sveltekit"]),
    ("angular", &["angular", "ngmodule", "rxjs"]),
    ("tailwindcss", &["tailwind", "utility class"]),
    ("prisma", &["prisma", "schema.prisma", "prisma migrate"]),
    ("drizzle-orm", &["drizzle"]),
    ("typeorm", &["typeorm", "entity"]),
    ("mongoose", &["mongoose", "mongodb"]),
    ("express", &["express", "middleware", "router"]),
    ("fastify", &["fastify"]),
    ("hono", &["hono"]),
    ("nestjs", &["nestjs", "nest.js", "injectable"]),
    ("fastapi", &["fastapi", "pydantic", "endpoint"]),
    ("django", &["django", "queryset", "admin site"]),
    ("flask", &["flask", "blueprint"]),
    ("sqlalchemy", &["sqlalchemy", "alembic"]),
    ("pydantic", &["pydantic", "basemodel"]),
    ("axum", &["axum", "extractor", "handler"]),
    ("actix-web", &["actix"]),
    ("tokio", &["tokio", "async runtime", "spawn"]),
    ("serde", &["serde", "serialize", "deserialize"]),
    ("diesel", &["diesel"]),
    ("sqlx", &["sqlx"]),
    ("clap", &["clap", "command line", "subcommand"]),
    ("rails", &["rails", "activerecord", "controller"]),
    ("github.com/gin-gonic/gin", &["gin", "gin.context"]),
    ("github.com/spf13/cobra", &["cobra", "subcommand"]),
    ("zod", &["zod", "schema validation"]),
    ("tanstack", &["react query", "tanstack", "usequery"]),
    ("stripe", &["stripe", "checkout", "subscription"]),
    ("next-auth", &["nextauth", "next-auth", "oauth"]),
];
